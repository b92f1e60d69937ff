use super::{PARTNER_FAILURE, Step};
use crate::domain::context::PaymentContext;
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::PartnerCommunicatorRef;
use crate::error::Result;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use tracing::warn;

/// Completes a redirect-based flow once the shopper is back from the partner.
pub struct ConfirmPayment {
    partner: PartnerCommunicatorRef,
}

impl ConfirmPayment {
    pub fn new(partner: PartnerCommunicatorRef) -> Self {
        Self { partner }
    }
}

#[async_trait]
impl Step for ConfirmPayment {
    fn name(&self) -> ActionName {
        ActionName::ConfirmPayment
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        let Some(confirmation) = ctx.confirmation.clone() else {
            ctx.halt("No redirect confirmation to process");
            return Ok(());
        };

        if confirmation.partner_name != ctx.partner.name {
            warn!(
                payment_id = %ctx.payment.id,
                expected = %ctx.partner.name,
                received = %confirmation.partner_name,
                "confirmation partner mismatch"
            );
            ctx.halt(format!(
                "Confirmation from partner {} does not match partner {}",
                confirmation.partner_name, ctx.partner.name
            ));
            return Ok(());
        }

        let response = self
            .partner
            .confirm_payment(ctx.headers(), &ctx.partner.name, &ctx.payment, &confirmation, &ctx.partner)
            .await;

        match response {
            Ok(result) => {
                ctx.payment = result;
                ctx.payment.action = None;
                if matches!(ctx.payment.status, PaymentStatus::Refused | PaymentStatus::Error) {
                    ctx.halt_requested = true;
                } else {
                    ctx.authentication.done = true;
                }
            }
            Err(e) => {
                warn!(payment_id = %ctx.payment.id, error = %e, "confirmation failed");
                ctx.halt(PARTNER_FAILURE);
            }
        }
        Ok(())
    }
}
