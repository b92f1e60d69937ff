//! Workflow steps. Each step mutates the execution context and performs at
//! most one outbound partner call.

pub mod authenticate;
pub mod authorize;
pub mod capture;
pub mod confirm;
pub mod fraud_score;
pub mod initiate;
pub mod refund;
pub mod terminate;
pub mod void;

use crate::domain::context::PaymentContext;
use crate::domain::event::PaymentEvent;
use crate::domain::payment::PaymentAction;
use crate::domain::ports::EventPublisherRef;
use crate::error::Result;
use crate::infrastructure::redirect::RedirectWrapper;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

pub use authenticate::Authenticate;
pub use authorize::Authorize;
pub use capture::Capture;
pub use confirm::ConfirmPayment;
pub use fraud_score::FraudScore;
pub use initiate::InitiatePayment;
pub use refund::Refund;
pub use terminate::Terminate;
pub use void::Void;

pub(crate) const PARTNER_FAILURE: &str = "Partner communication failed";

#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> ActionName;

    /// Runs the step. Business failures are recorded on the context; an
    /// `Err` aborts the whole workflow.
    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()>;
}

/// Owned, type-erased step as built by the registry.
pub type StepBox = Box<dyn Step>;

/// Publishes an event; failures are logged and never fail the step.
pub(crate) async fn publish(events: &EventPublisherRef, event: PaymentEvent) {
    let event_type = event.event_type;
    let payment_id = event.payment.id;
    if let Err(e) = events.publish(event).await {
        warn!(%payment_id, %event_type, error = %e, "failed to publish payment event");
    }
}

/// Replaces a raw partner redirect with our own wrapped one.
pub(crate) fn wrap_redirect(
    redirect: &RedirectWrapper,
    payment_id: Uuid,
    action: Option<PaymentAction>,
) -> Result<Option<PaymentAction>> {
    match action {
        Some(action) if !redirect.is_wrapped(&action) => Ok(Some(redirect.wrap(payment_id, &action)?)),
        other => Ok(other),
    }
}
