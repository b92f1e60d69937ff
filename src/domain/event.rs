use crate::domain::operation::Operation;
use crate::domain::payment::Payment;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum PaymentEventType {
    #[serde(rename = "payment.initiated")]
    Initiated,
    #[serde(rename = "payment.authenticated")]
    Authenticated,
    #[serde(rename = "payment.authorized")]
    Authorized,
    #[serde(rename = "payment.captured")]
    Captured,
    #[serde(rename = "payment.voided")]
    Voided,
    #[serde(rename = "payment.refunded")]
    Refunded,
}

impl fmt::Display for PaymentEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentEventType::Initiated => "payment.initiated",
            PaymentEventType::Authenticated => "payment.authenticated",
            PaymentEventType::Authorized => "payment.authorized",
            PaymentEventType::Captured => "payment.captured",
            PaymentEventType::Voided => "payment.voided",
            PaymentEventType::Refunded => "payment.refunded",
        };
        f.write_str(s)
    }
}

/// Snapshot published after a workflow step. Transports key on
/// `payment.id` so events of one payment stay ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub event_type: PaymentEventType,
    pub payment: Payment,
    pub operation: Option<Operation>,
}

impl PaymentEvent {
    /// Creates an event carrying a snapshot of `payment`.
    pub fn new(event_type: PaymentEventType, payment: &Payment) -> Self {
        Self {
            event_type,
            payment: payment.clone(),
            operation: None,
        }
    }

    /// Attaches the operation that produced the event.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }
}
