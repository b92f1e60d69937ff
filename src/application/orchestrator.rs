use crate::application::registry::ActionRegistry;
use crate::domain::context::{Confirmation, PaymentContext, RequestMeta};
use crate::domain::merchant::Merchant;
use crate::domain::operation::{CaptureOperation, RefundOperation};
use crate::domain::payment::{Amount, Payment, PaymentStatus};
use crate::error::{PaymentError, Result};
use crate::workflow::definition::{ActionName, WorkflowDefinition};
use rust_decimal::Decimal;
use tracing::{Instrument, debug, error, info, info_span};

/// Steps a single run may take before the loop guard fires.
pub const DEFAULT_MAX_STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Loop guard: a run that has not reached `Terminate` after this many
    /// steps is aborted.
    pub max_steps: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Result of one workflow execution.
///
/// `success` is false only when the workflow itself could not run to the
/// end (unknown merchant, bad card data, configuration bug, loop guard). A
/// declined payment is still a successful run.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub success: bool,
    pub context: Option<PaymentContext>,
    pub error: Option<PaymentError>,
}

impl WorkflowOutcome {
    fn completed(context: PaymentContext) -> Self {
        Self {
            success: true,
            context: Some(context),
            error: None,
        }
    }

    fn failed(context: Option<PaymentContext>, error: PaymentError) -> Self {
        Self {
            success: false,
            context,
            error: Some(error),
        }
    }

    /// The payment as the run left it, when a context was built.
    pub fn payment(&self) -> Option<&Payment> {
        self.context.as_ref().map(|ctx| &ctx.payment)
    }
}

/// Drives payments through the workflow graph.
///
/// Built once at startup and shared by reference; every execution owns its
/// own `PaymentContext`.
pub struct PaymentOrchestrator {
    registry: ActionRegistry,
    definition: WorkflowDefinition,
    config: OrchestratorConfig,
}

impl PaymentOrchestrator {
    /// Fails fast when the definition references unknown actions or actions
    /// the registry cannot build.
    pub fn new(
        registry: ActionRegistry,
        definition: WorkflowDefinition,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        definition.validate()?;
        if let Some(missing) = definition
            .actions
            .iter()
            .map(|action| action.name)
            .find(|name| !registry.is_registered(*name))
        {
            return Err(PaymentError::ActionNotRegistered(missing));
        }
        Ok(Self {
            registry,
            definition,
            config,
        })
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Runs a new payment from `InitiatePayment`.
    pub async fn execute_payment(&self, payment: Payment, request: RequestMeta) -> WorkflowOutcome {
        self.start(payment, request, ActionName::InitiatePayment, |_| {})
            .await
    }

    /// Resumes a payment after the shopper returns from a partner redirect.
    pub async fn confirm_payment(
        &self,
        payment: Payment,
        request: RequestMeta,
        confirmation: Confirmation,
    ) -> WorkflowOutcome {
        self.start(payment, request, ActionName::ConfirmPayment, |ctx| {
            ctx.confirmation = Some(confirmation);
        })
        .await
    }

    /// Captures an authorized payment; `amount` defaults to the uncaptured
    /// remainder. Amounts above that remainder are rejected before any step
    /// runs.
    pub async fn capture_payment(
        &self,
        payment: Payment,
        request: RequestMeta,
        amount: Option<Amount>,
    ) -> WorkflowOutcome {
        if !matches!(
            payment.status,
            PaymentStatus::Authorized | PaymentStatus::PartiallyCaptured
        ) {
            let error = PaymentError::Validation(format!(
                "Payment in status {} cannot be captured",
                payment.status
            ));
            return WorkflowOutcome::failed(None, error);
        }

        let remaining = payment.amount.value() - payment.captured_amount;
        let requested = amount.map(|a| a.value()).unwrap_or(remaining);
        if requested > remaining || remaining <= Decimal::ZERO {
            let error = PaymentError::Validation(format!(
                "Capture amount too high: requested {}, uncaptured {}",
                requested, remaining
            ));
            return WorkflowOutcome::failed(None, error);
        }
        let capture = CaptureOperation::new(requested);
        self.start(payment, request, ActionName::Capture, |ctx| {
            ctx.capture = Some(capture);
        })
        .await
    }

    /// Voids an authorization, or the uncaptured remainder of a partially
    /// captured payment. Ineligible payments are refused without a partner call.
    pub async fn void_payment(&self, payment: Payment, request: RequestMeta) -> WorkflowOutcome {
        self.start(payment, request, ActionName::Void, |_| {}).await
    }

    /// Refunds part or all of the captured funds.
    ///
    /// # Arguments
    ///
    /// * `payment` - A captured or partially captured payment.
    /// * `request` - Forwarded request metadata.
    /// * `amount` - Amount to return; must not exceed the refundable balance.
    /// * `reason` - Optional merchant-supplied reason, kept on the refund record.
    pub async fn refund_payment(
        &self,
        payment: Payment,
        request: RequestMeta,
        amount: Amount,
        reason: Option<String>,
    ) -> WorkflowOutcome {
        let refund = RefundOperation::new(amount.value(), reason);
        self.start(payment, request, ActionName::Refund, |ctx| {
            ctx.refund = Some(refund);
        })
        .await
    }

    async fn start(
        &self,
        payment: Payment,
        request: RequestMeta,
        start: ActionName,
        seed: impl FnOnce(&mut PaymentContext),
    ) -> WorkflowOutcome {
        let span = info_span!("workflow", payment_id = %payment.id, start = %start);
        async move {
            let merchant = match self.resolve_merchant(&payment, &request).await {
                Ok(merchant) => merchant,
                Err(e) => {
                    error!(error = %e, "merchant resolution failed");
                    return WorkflowOutcome::failed(None, e);
                }
            };

            let mut ctx = PaymentContext::new(payment, merchant, request);
            if ctx.payment.merchant_id.is_none() {
                ctx.payment.merchant_id = Some(ctx.merchant.id.clone());
            }
            seed(&mut ctx);

            match self.run(start, &mut ctx).await {
                Ok(()) => {
                    info!(status = %ctx.payment.status, steps = ctx.executed.len(), "workflow completed");
                    WorkflowOutcome::completed(ctx)
                }
                Err(e) => {
                    error!(error = %e, "workflow aborted");
                    WorkflowOutcome::failed(Some(ctx), e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn resolve_merchant(&self, payment: &Payment, request: &RequestMeta) -> Result<Merchant> {
        let merchant_id = payment
            .merchant_id
            .as_deref()
            .or(request.merchant_id.as_deref())
            .ok_or_else(|| {
                PaymentError::MerchantNotFound("no merchant on payment or request".to_string())
            })?;

        self.registry
            .collaborators()
            .merchants
            .get_merchant(&request.headers, merchant_id)
            .await?
            .ok_or_else(|| PaymentError::MerchantNotFound(merchant_id.to_string()))
    }

    /// Walks the graph from `start` until `Terminate`.
    ///
    /// Errors raised by a step, an unknown edge target, or the loop guard
    /// abort the run; the context keeps whatever the steps wrote so far.
    pub async fn run(&self, start: ActionName, ctx: &mut PaymentContext) -> Result<()> {
        let mut current = start;
        let mut steps = 0;

        while current != ActionName::Terminate && steps < self.config.max_steps {
            let step = self.registry.get_action(current)?;
            step.execute(ctx).await?;
            ctx.executed.push(current);
            steps += 1;

            let next = if ctx.halt_requested {
                ActionName::Terminate
            } else {
                let snapshot = serde_json::to_value(&*ctx)?;
                self.definition.next_action(current, &snapshot)?
            };
            debug!(from = %current, to = %next, status = %ctx.payment.status, "transition");
            current = next;
        }

        if current != ActionName::Terminate {
            return Err(PaymentError::LoopGuard { steps });
        }

        self.registry
            .get_action(ActionName::Terminate)?
            .execute(ctx)
            .await?;
        ctx.executed.push(ActionName::Terminate);
        Ok(())
    }
}
