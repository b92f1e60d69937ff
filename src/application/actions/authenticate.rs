use super::{Step, publish, wrap_redirect};
use crate::domain::context::PaymentContext;
use crate::domain::event::{PaymentEvent, PaymentEventType};
use crate::domain::ports::{EventPublisherRef, PartnerCommunicatorRef};
use crate::error::Result;
use crate::infrastructure::redirect::RedirectWrapper;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs shopper authentication with the partner.
///
/// When the partner asks for a redirect the step leaves `authentication.done`
/// unset; the flow resumes through `ConfirmPayment` once the shopper is back.
pub struct Authenticate {
    partner: PartnerCommunicatorRef,
    events: EventPublisherRef,
    redirect: Arc<RedirectWrapper>,
}

impl Authenticate {
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
impl Step for Authenticate {
    fn name(&self) -> ActionName {
        ActionName::Authenticate
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        let payment_id = ctx.payment.id;
        ctx.payment.authentication.return_url =
            Some(self.redirect.return_url(payment_id, &ctx.partner.name));

        let response = self
            .partner
            .authenticate_payment(ctx.headers(), &ctx.partner.name, &ctx.payment, &ctx.partner)
            .await
            .and_then(|result| {
                let action = wrap_redirect(&self.redirect, payment_id, result.action)?;
                Ok((result.authentication, action))
            });

        match response {
            Ok((authentication, action)) => {
                ctx.payment.authentication = authentication;
                ctx.payment.action = action;
                if ctx.payment.action.is_none() {
                    ctx.authentication.done = true;
                    publish(
                        &self.events,
                        PaymentEvent::new(PaymentEventType::Authenticated, &ctx.payment),
                    )
                    .await;
                } else {
                    info!(%payment_id, "authentication requires shopper redirect");
                }
            }
            Err(e) => {
                warn!(%payment_id, partner = %ctx.partner.name, error = %e, "authentication failed");
                ctx.halt("Authentication failed");
            }
        }
        Ok(())
    }
}
