use crate::workflow::definition::ActionName;
use miette::Diagnostic;
use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug, Diagnostic)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    #[diagnostic(code(payflow::validation))]
    Validation(String),

    #[error("Merchant not found: {0}")]
    #[diagnostic(code(payflow::merchant_not_found))]
    MerchantNotFound(String),

    #[error("Partner communication failed: {0}")]
    #[diagnostic(code(payflow::partner))]
    PartnerCommunication(String),

    #[error("Token vault error: {0}")]
    #[diagnostic(code(payflow::token_vault))]
    TokenVault(String),

    #[error("Unknown action in workflow definition: {0}")]
    #[diagnostic(
        code(payflow::config::unknown_action),
        help("every edge target must name one of the registered actions")
    )]
    UnknownAction(String),

    #[error("Workflow definition has no node for action {0}")]
    #[diagnostic(code(payflow::config::missing_node))]
    MissingWorkflowNode(ActionName),

    #[error("Action {0} is not registered")]
    #[diagnostic(code(payflow::config::unregistered_action))]
    ActionNotRegistered(ActionName),

    #[error("Workflow exceeded {steps} steps, possible infinite loop")]
    #[diagnostic(code(payflow::loop_guard))]
    LoopGuard { steps: usize },

    #[error("Redirect error: {0}")]
    #[diagnostic(code(payflow::redirect))]
    Redirect(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentError {
    /// Errors caused by a malformed workflow definition or action registry
    /// rather than by the payment being processed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PaymentError::UnknownAction(_)
                | PaymentError::MissingWorkflowNode(_)
                | PaymentError::ActionNotRegistered(_)
        )
    }
}
