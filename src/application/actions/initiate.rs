use super::{Step, publish};
use crate::application::tokenization::tokenize_instrument;
use crate::domain::context::{PaymentContext, RetryConfig};
use crate::domain::event::{PaymentEvent, PaymentEventType};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{EventPublisherRef, TokenVaultRef};
use crate::error::Result;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use chrono::Utc;

/// First step of every payment: resets the run state and tokenizes the card.
///
/// A card that fails validation aborts the workflow.
pub struct InitiatePayment {
    token_vault: TokenVaultRef,
    events: EventPublisherRef,
}

impl InitiatePayment {
    pub fn new(token_vault: TokenVaultRef, events: EventPublisherRef) -> Self {
        Self { token_vault, events }
    }
}

#[async_trait]
impl Step for InitiatePayment {
    fn name(&self) -> ActionName {
        ActionName::InitiatePayment
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        ctx.reset_attempts();
        ctx.config = RetryConfig::default();

        tokenize_instrument(
            self.token_vault.as_ref(),
            &ctx.request.headers,
            &mut ctx.payment,
            Utc::now().date_naive(),
        )
        .await?;

        ctx.payment.status = PaymentStatus::Initiated;
        publish(
            &self.events,
            PaymentEvent::new(PaymentEventType::Initiated, &ctx.payment),
        )
        .await;
        Ok(())
    }
}
