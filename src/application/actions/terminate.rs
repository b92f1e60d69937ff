use super::Step;
use crate::domain::context::PaymentContext;
use crate::error::Result;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use tracing::debug;

/// Leaf of every run. Does nothing.
pub struct Terminate;

#[async_trait]
impl Step for Terminate {
    fn name(&self) -> ActionName {
        ActionName::Terminate
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        debug!(payment_id = %ctx.payment.id, status = %ctx.payment.status, "workflow terminated");
        Ok(())
    }
}
