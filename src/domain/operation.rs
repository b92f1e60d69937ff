//! Sub-transactions against an already authorized payment.
//!
//! An operation record is created once per operation family and kept across
//! retries, so every retry reports against the same operation id.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureStatus {
    Pending,
    Captured,
    CaptureFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOperation {
    pub id: Uuid,
    pub amount: Decimal,
    pub status: CaptureStatus,
    pub partner_reference: Option<String>,
    pub refusal_reason: Option<String>,
}

impl CaptureOperation {
    /// Creates a pending capture for `amount`.
    pub fn new(amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            status: CaptureStatus::Pending,
            partner_reference: None,
            refusal_reason: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Refunded,
    /// Rejected before reaching the partner; never retried.
    Failed,
    /// The partner call failed; eligible for retry.
    RefundFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOperation {
    pub id: Uuid,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub status: RefundStatus,
    pub partner_reference: Option<String>,
    pub refusal_reason: Option<String>,
}

impl RefundOperation {
    /// Creates a pending refund for `amount`.
    pub fn new(amount: Decimal, reason: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            reason,
            status: RefundStatus::Pending,
            partner_reference: None,
            refusal_reason: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoidStatus {
    Pending,
    Voided,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoidOperation {
    pub id: Uuid,
    pub status: VoidStatus,
    pub partner_reference: Option<String>,
    pub refusal_reason: Option<String>,
}

impl VoidOperation {
    /// Creates a pending void.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: VoidStatus::Pending,
            partner_reference: None,
            refusal_reason: None,
        }
    }
}

impl Default for VoidOperation {
    fn default() -> Self {
        Self::new()
    }
}

/// Operation snapshot attached to published events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Operation {
    Capture(CaptureOperation),
    Refund(RefundOperation),
    Void(VoidOperation),
}

impl Operation {
    pub fn id(&self) -> Uuid {
        match self {
            Operation::Capture(op) => op.id,
            Operation::Refund(op) => op.id,
            Operation::Void(op) => op.id,
        }
    }
}
