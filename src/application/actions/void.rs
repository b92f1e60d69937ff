use super::{PARTNER_FAILURE, Step, publish};
use crate::domain::context::PaymentContext;
use crate::domain::event::{PaymentEvent, PaymentEventType};
use crate::domain::operation::{Operation, VoidStatus};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{EventPublisherRef, PartnerCommunicatorRef};
use crate::error::Result;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use tracing::warn;

/// Why a payment in `status` cannot be voided, or `None` when it can.
pub fn void_refusal_reason(status: PaymentStatus) -> Option<&'static str> {
    match status {
        PaymentStatus::Authorized | PaymentStatus::PartiallyCaptured => None,
        PaymentStatus::Captured => Some("Payment has already been captured, refund it instead"),
        PaymentStatus::Voided => Some("Payment has already been voided"),
        PaymentStatus::Refused => Some("Payment was refused, there is nothing to void"),
        PaymentStatus::Refunded => Some("Payment has been refunded and can no longer be voided"),
        PaymentStatus::Reversed => Some("Payment has been reversed and can no longer be voided"),
        PaymentStatus::Initiated => Some("Payment has not been authorized yet"),
        PaymentStatus::AuthorizationPending => Some("Payment authorization is still pending"),
        PaymentStatus::Error => Some("Payment is in error and cannot be voided"),
    }
}

/// Cancels an authorization. Voiding a partially captured payment releases
/// the uncaptured remainder and leaves the payment captured.
pub struct Void {
    partner: PartnerCommunicatorRef,
    events: EventPublisherRef,
}

impl Void {
    pub fn new(partner: PartnerCommunicatorRef, events: EventPublisherRef) -> Self {
        Self { partner, events }
    }
}

#[async_trait]
impl Step for Void {
    fn name(&self) -> ActionName {
        ActionName::Void
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        ctx.void_attempts += 1;
        let mut void = ctx.void.take().unwrap_or_default();
        let prior_status = ctx.payment.status;

        if let Some(reason) = void_refusal_reason(prior_status) {
            void.status = VoidStatus::Failed;
            void.refusal_reason = Some(reason.to_string());
        } else {
            let response = self
                .partner
                .void_payment(ctx.headers(), &ctx.partner.name, &ctx.payment, &void, &ctx.partner)
                .await;

            match response {
                Ok(result) => {
                    void.status = result.status;
                    void.refusal_reason = result.refusal_reason;
                    if result.partner_reference.is_some() {
                        void.partner_reference = result.partner_reference;
                    }
                }
                Err(e) => {
                    warn!(payment_id = %ctx.payment.id, void_id = %void.id, error = %e, "void failed");
                    void.status = VoidStatus::Failed;
                    void.refusal_reason = Some(PARTNER_FAILURE.to_string());
                }
            }

            if void.status == VoidStatus::Voided {
                ctx.payment.status = if prior_status == PaymentStatus::PartiallyCaptured {
                    PaymentStatus::Captured
                } else {
                    PaymentStatus::Voided
                };
            }
        }

        ctx.void = Some(void.clone());
        publish(
            &self.events,
            PaymentEvent::new(PaymentEventType::Voided, &ctx.payment)
                .with_operation(Operation::Void(void)),
        )
        .await;
        Ok(())
    }
}
