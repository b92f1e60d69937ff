use super::{PARTNER_FAILURE, Step, publish};
use crate::domain::context::PaymentContext;
use crate::domain::event::{PaymentEvent, PaymentEventType};
use crate::domain::operation::{Operation, RefundOperation, RefundStatus};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{EventPublisherRef, PartnerCommunicatorRef};
use crate::error::Result;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::warn;

/// Refusal reason for a payment with nothing left to refund.
pub const FULLY_REFUNDED: &str = "Payment has already been fully refunded";

/// Why a payment in `status` cannot be refunded, or `None` when it can.
///
/// `REFUNDED` is accepted here; a payment with nothing left to refund is
/// caught by the balance check.
pub fn refund_refusal_reason(status: PaymentStatus) -> Option<&'static str> {
    match status {
        PaymentStatus::Captured | PaymentStatus::PartiallyCaptured | PaymentStatus::Refunded => None,
        PaymentStatus::Authorized => Some("Payment has not been captured yet, void it instead"),
        PaymentStatus::Voided => Some("Payment has been voided, there is nothing to refund"),
        PaymentStatus::Refused => Some("Payment was refused, there is nothing to refund"),
        PaymentStatus::Reversed => Some("Payment has been reversed and can no longer be refunded"),
        PaymentStatus::Initiated => Some("Payment has not been authorized yet"),
        PaymentStatus::AuthorizationPending => Some("Payment authorization is still pending"),
        PaymentStatus::Error => Some("Payment is in error and cannot be refunded"),
    }
}

/// Refunds captured funds. Requests that fail validation are marked
/// `FAILED` without reaching the partner; partner failures are marked
/// `REFUND_FAILED` and retried.
pub struct Refund {
    partner: PartnerCommunicatorRef,
    events: EventPublisherRef,
}

impl Refund {
    pub fn new(partner: PartnerCommunicatorRef, events: EventPublisherRef) -> Self {
        Self { partner, events }
    }

    fn rejection(ctx: &PaymentContext, refund: &RefundOperation) -> Option<String> {
        if let Some(reason) = refund_refusal_reason(ctx.payment.status) {
            return Some(reason.to_string());
        }
        let refundable = ctx.payment.refundable_amount();
        if refundable <= Decimal::ZERO {
            return Some(FULLY_REFUNDED.to_string());
        }
        if refund.amount > refundable {
            return Some(format!(
                "Refund amount too high: requested {}, refundable {}",
                refund.amount, refundable
            ));
        }
        if refund.amount <= Decimal::ZERO {
            return Some("Refund amount must be positive".to_string());
        }
        None
    }
}

#[async_trait]
impl Step for Refund {
    fn name(&self) -> ActionName {
        ActionName::Refund
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        ctx.refund_attempts += 1;
        let refundable = ctx.payment.refundable_amount();
        let mut refund = ctx
            .refund
            .take()
            .unwrap_or_else(|| RefundOperation::new(refundable, None));

        if let Some(reason) = Self::rejection(ctx, &refund) {
            refund.status = RefundStatus::Failed;
            refund.refusal_reason = Some(reason);
        } else {
            let response = self
                .partner
                .refund_payment(ctx.headers(), &ctx.partner.name, &ctx.payment, &refund, &ctx.partner)
                .await;

            match response {
                Ok(result) => {
                    refund.status = result.status;
                    refund.refusal_reason = result.refusal_reason;
                    if result.partner_reference.is_some() {
                        refund.partner_reference = result.partner_reference;
                    }
                }
                Err(e) => {
                    warn!(payment_id = %ctx.payment.id, refund_id = %refund.id, error = %e, "refund failed");
                    refund.status = RefundStatus::RefundFailed;
                    refund.refusal_reason = Some(PARTNER_FAILURE.to_string());
                }
            }

            if refund.status == RefundStatus::Refunded {
                ctx.payment.refunded_amount += refund.amount;
                ctx.payment.status = PaymentStatus::Refunded;
            }
        }

        ctx.refund = Some(refund.clone());
        publish(
            &self.events,
            PaymentEvent::new(PaymentEventType::Refunded, &ctx.payment)
                .with_operation(Operation::Refund(refund)),
        )
        .await;
        Ok(())
    }
}
