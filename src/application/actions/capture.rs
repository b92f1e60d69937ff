use super::{PARTNER_FAILURE, Step, publish};
use crate::domain::context::PaymentContext;
use crate::domain::event::{PaymentEvent, PaymentEventType};
use crate::domain::operation::{CaptureOperation, CaptureStatus, Operation};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{EventPublisherRef, PartnerCommunicatorRef};
use crate::error::Result;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use tracing::warn;

/// Captures an authorized payment.
///
/// The capture record is created on first entry and reused by every retry.
/// A failed capture never changes the payment status.
pub struct Capture {
    partner: PartnerCommunicatorRef,
    events: EventPublisherRef,
}

impl Capture {
    pub fn new(partner: PartnerCommunicatorRef, events: EventPublisherRef) -> Self {
        Self { partner, events }
    }
}

#[async_trait]
impl Step for Capture {
    fn name(&self) -> ActionName {
        ActionName::Capture
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        ctx.capture_attempts += 1;
        let remaining = ctx.payment.amount.value() - ctx.payment.captured_amount;
        let mut capture = ctx
            .capture
            .take()
            .unwrap_or_else(|| CaptureOperation::new(remaining));

        let response = self
            .partner
            .capture_payment(ctx.headers(), &ctx.partner.name, &ctx.payment, &capture, &ctx.partner)
            .await;

        match response {
            Ok(result) => {
                capture.status = result.status;
                capture.refusal_reason = result.refusal_reason;
                if result.partner_reference.is_some() {
                    capture.partner_reference = result.partner_reference;
                }
            }
            Err(e) => {
                warn!(payment_id = %ctx.payment.id, capture_id = %capture.id, error = %e, "capture failed");
                capture.status = CaptureStatus::CaptureFailed;
                capture.refusal_reason = Some(PARTNER_FAILURE.to_string());
            }
        }

        let captured = capture.status == CaptureStatus::Captured;
        if captured {
            ctx.payment.captured_amount += capture.amount;
            ctx.payment.status = if ctx.payment.captured_amount < ctx.payment.amount.value() {
                PaymentStatus::PartiallyCaptured
            } else {
                PaymentStatus::Captured
            };
        }

        let out_of_attempts = ctx.capture_attempts >= ctx.config.max_capture_attempts;
        ctx.capture = Some(capture.clone());
        if captured || out_of_attempts {
            publish(
                &self.events,
                PaymentEvent::new(PaymentEventType::Captured, &ctx.payment)
                    .with_operation(Operation::Capture(capture)),
            )
            .await;
        }
        Ok(())
    }
}
