use super::{PARTNER_FAILURE, Step, publish, wrap_redirect};
use crate::domain::context::PaymentContext;
use crate::domain::event::{PaymentEvent, PaymentEventType};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{EventPublisherRef, PartnerCommunicatorRef};
use crate::error::Result;
use crate::infrastructure::redirect::RedirectWrapper;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Sends the payment to the partner for authorization.
///
/// Partner failures mark the payment `ERROR`; a refusal is kept as returned.
pub struct Authorize {
    partner: PartnerCommunicatorRef,
    events: EventPublisherRef,
    redirect: Arc<RedirectWrapper>,
}

impl Authorize {
    /// Creates the step from its collaborators.
    pub fn new(
        partner: PartnerCommunicatorRef,
        events: EventPublisherRef,
        redirect: Arc<RedirectWrapper>,
    ) -> Self {
        Self {
            partner,
            events,
            redirect,
        }
    }
}

#[async_trait]
impl Step for Authorize {
    fn name(&self) -> ActionName {
        ActionName::Authorize
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        ctx.authorize_attempts += 1;
        let payment_id = ctx.payment.id;

        let response = self
            .partner
            .authorize_payment(ctx.headers(), &ctx.partner.name, &ctx.payment, &ctx.partner)
            .await
            .and_then(|mut result| {
                result.action = wrap_redirect(&self.redirect, payment_id, result.action.take())?;
                Ok(result)
            });

        match response {
            Ok(result) => {
                ctx.payment = result;
                info!(
                    %payment_id,
                    status = %ctx.payment.status,
                    attempt = ctx.authorize_attempts,
                    "authorization completed"
                );
            }
            Err(e) => {
                warn!(%payment_id, partner = %ctx.partner.name, error = %e, "authorization failed");
                ctx.payment.status = PaymentStatus::Error;
                ctx.payment.refusal_reason = Some(PARTNER_FAILURE.to_string());
            }
        }

        // A refusal that will be retried is not final yet.
        let out_of_attempts = ctx.authorize_attempts >= ctx.config.max_authorize_attempts;
        if out_of_attempts || ctx.payment.status != PaymentStatus::Refused {
            publish(
                &self.events,
                PaymentEvent::new(PaymentEventType::Authorized, &ctx.payment),
            )
            .await;
        }
        Ok(())
    }
}
