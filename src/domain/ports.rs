//! Contracts of the services the workflow talks to.
//!
//! Every call carries the forwarded headers of the inbound request.

use super::context::Confirmation;
use super::event::PaymentEvent;
use super::merchant::{Merchant, PartnerConfig};
use super::operation::{CaptureOperation, RefundOperation, VoidOperation};
use super::payment::{CardData, Payment, TokenizedCard};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Request headers forwarded from the inbound call.
pub type Headers = BTreeMap<String, String>;

#[async_trait]
pub trait PartnerCommunicator: Send + Sync {
    async fn authenticate_payment(
        &self,
        headers: &Headers,
        partner_name: &str,
        payment: &Payment,
        partner_config: &PartnerConfig,
    ) -> Result<Payment>;

    async fn authorize_payment(
        &self,
        headers: &Headers,
        partner_name: &str,
        payment: &Payment,
        partner_config: &PartnerConfig,
    ) -> Result<Payment>;

    async fn capture_payment(
        &self,
        headers: &Headers,
        partner_name: &str,
        payment: &Payment,
        capture: &CaptureOperation,
        partner_config: &PartnerConfig,
    ) -> Result<CaptureOperation>;

    async fn refund_payment(
        &self,
        headers: &Headers,
        partner_name: &str,
        payment: &Payment,
        refund: &RefundOperation,
        partner_config: &PartnerConfig,
    ) -> Result<RefundOperation>;

    async fn void_payment(
        &self,
        headers: &Headers,
        partner_name: &str,
        payment: &Payment,
        void: &VoidOperation,
        partner_config: &PartnerConfig,
    ) -> Result<VoidOperation>;

    /// Completes a payment after the shopper comes back from a redirect.
    async fn confirm_payment(
        &self,
        headers: &Headers,
        partner_name: &str,
        payment: &Payment,
        confirmation: &Confirmation,
        partner_config: &PartnerConfig,
    ) -> Result<Payment>;
}

#[async_trait]
pub trait MerchantLookup: Send + Sync {
    async fn get_merchant(&self, headers: &Headers, merchant_id: &str) -> Result<Option<Merchant>>;
}

#[async_trait]
pub trait TokenVault: Send + Sync {
    async fn create_token(&self, headers: &Headers, card: &CardData) -> Result<TokenizedCard>;
    async fn decrypt_token(&self, headers: &Headers, token: &str, merchant_id: &str)
    -> Result<CardData>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: PaymentEvent) -> Result<()>;
}

/// Produces the 0-99 risk score the FraudScore step turns into advice.
pub trait FraudScorer: Send + Sync {
    fn score(&self, payment: &Payment) -> u8;
}

pub type PartnerCommunicatorRef = Arc<dyn PartnerCommunicator>;
pub type MerchantLookupRef = Arc<dyn MerchantLookup>;
pub type TokenVaultRef = Arc<dyn TokenVault>;
pub type EventPublisherRef = Arc<dyn EventPublisher>;
pub type FraudScorerRef = Arc<dyn FraudScorer>;
