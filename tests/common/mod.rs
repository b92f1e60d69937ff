#![allow(dead_code)]

use async_trait::async_trait;
use payflow::application::orchestrator::{OrchestratorConfig, PaymentOrchestrator};
use payflow::application::registry::{ActionRegistry, Collaborators};
use payflow::domain::context::Confirmation;
use payflow::domain::merchant::{Merchant, PartnerConfig};
use payflow::domain::operation::{
    CaptureOperation, CaptureStatus, RefundOperation, RefundStatus, VoidOperation, VoidStatus,
};
use payflow::domain::payment::{Amount, CardData, Payment, PaymentAction, PaymentStatus};
use payflow::domain::ports::{Headers, PartnerCommunicator};
use payflow::error::{PaymentError, Result};
use payflow::infrastructure::fraud::FixedFraudScorer;
use payflow::infrastructure::in_memory::{
    InMemoryMerchantStore, InMemoryTokenVault, RecordingEventPublisher,
};
use payflow::infrastructure::redirect::RedirectWrapper;
use payflow::workflow::definition::WorkflowDefinition;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const MERCHANT_ID: &str = "shop";
pub const PARTNER_NAME: &str = "scripted";

/// Partner double with scripted answers that records every call it gets.
#[derive(Default)]
pub struct ScriptedPartner {
    calls: Mutex<Vec<&'static str>>,
    authorize_statuses: Mutex<VecDeque<PaymentStatus>>,
    capture_failures: Mutex<usize>,
    capture_ids: Mutex<Vec<Uuid>>,
    challenge: Mutex<Option<PaymentAction>>,
    fail_refunds: bool,
}

impl ScriptedPartner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorization answers, in order. Once exhausted, payments are authorized.
    pub fn with_authorize_statuses(self, statuses: impl IntoIterator<Item = PaymentStatus>) -> Self {
        *self.authorize_statuses.lock().unwrap() = statuses.into_iter().collect();
        self
    }

    /// Fails the first `count` capture calls.
    pub fn with_capture_failures(self, count: usize) -> Self {
        *self.capture_failures.lock().unwrap() = count;
        self
    }

    pub fn with_challenge(self, action: PaymentAction) -> Self {
        *self.challenge.lock().unwrap() = Some(action);
        self
    }

    pub fn with_failing_refunds(mut self) -> Self {
        self.fail_refunds = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn capture_ids(&self) -> Vec<Uuid> {
        self.capture_ids.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PartnerCommunicator for ScriptedPartner {
    async fn authenticate_payment(
        &self,
        _headers: &Headers,
        _partner_name: &str,
        payment: &Payment,
        _partner_config: &PartnerConfig,
    ) -> Result<Payment> {
        self.record("authenticate");
        let mut result = payment.clone();
        result.action = self.challenge.lock().unwrap().clone();
        Ok(result)
    }

    async fn authorize_payment(
        &self,
        _headers: &Headers,
        _partner_name: &str,
        payment: &Payment,
        _partner_config: &PartnerConfig,
    ) -> Result<Payment> {
        self.record("authorize");
        let status = self
            .authorize_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PaymentStatus::Authorized);
        let mut result = payment.clone();
        result.status = status;
        if status == PaymentStatus::Refused {
            result.refusal_reason = Some("Do not honor".to_string());
        }
        Ok(result)
    }

    async fn capture_payment(
        &self,
        _headers: &Headers,
        _partner_name: &str,
        _payment: &Payment,
        capture: &CaptureOperation,
        _partner_config: &PartnerConfig,
    ) -> Result<CaptureOperation> {
        self.record("capture");
        self.capture_ids.lock().unwrap().push(capture.id);
        let mut result = capture.clone();
        let mut failures = self.capture_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            result.status = CaptureStatus::CaptureFailed;
            result.refusal_reason = Some("Acquirer unavailable".to_string());
        } else {
            result.status = CaptureStatus::Captured;
        }
        Ok(result)
    }

    async fn refund_payment(
        &self,
        _headers: &Headers,
        _partner_name: &str,
        _payment: &Payment,
        refund: &RefundOperation,
        _partner_config: &PartnerConfig,
    ) -> Result<RefundOperation> {
        self.record("refund");
        if self.fail_refunds {
            return Err(PaymentError::PartnerCommunication("timeout".to_string()));
        }
        let mut result = refund.clone();
        result.status = RefundStatus::Refunded;
        Ok(result)
    }

    async fn void_payment(
        &self,
        _headers: &Headers,
        _partner_name: &str,
        _payment: &Payment,
        void: &VoidOperation,
        _partner_config: &PartnerConfig,
    ) -> Result<VoidOperation> {
        self.record("void");
        let mut result = void.clone();
        result.status = VoidStatus::Voided;
        Ok(result)
    }

    async fn confirm_payment(
        &self,
        _headers: &Headers,
        _partner_name: &str,
        payment: &Payment,
        _confirmation: &Confirmation,
        _partner_config: &PartnerConfig,
    ) -> Result<Payment> {
        self.record("confirm");
        Ok(payment.clone())
    }
}

pub fn merchant() -> Merchant {
    Merchant::new(MERCHANT_ID, "Test Shop", PartnerConfig::new(PARTNER_NAME))
}

pub fn card() -> CardData {
    CardData {
        number: "4111 1111 1111 1111".to_string(),
        expiry_month: 12,
        expiry_year: 2099,
        cvc: "123".to_string(),
        holder_name: Some("Jane Doe".to_string()),
    }
}

pub fn card_payment(amount: Decimal) -> Payment {
    Payment::new(Amount::new(amount).unwrap(), "EUR")
        .with_merchant(MERCHANT_ID)
        .with_card(card())
}

pub fn redirect() -> RedirectWrapper {
    RedirectWrapper::new("test-secret", "https://pay.test", "https://api.test")
}

/// Orchestrator wired to a scripted partner and in-memory adapters.
pub struct Harness {
    pub partner: Arc<ScriptedPartner>,
    pub events: Arc<RecordingEventPublisher>,
    pub vault: Arc<InMemoryTokenVault>,
    pub orchestrator: PaymentOrchestrator,
}

impl Harness {
    pub async fn new(partner: ScriptedPartner, merchant: Merchant, fraud_score: u8) -> Self {
        Self::with_definition(partner, merchant, fraud_score, WorkflowDefinition::payment())
            .await
            .unwrap()
    }

    pub async fn with_definition(
        partner: ScriptedPartner,
        merchant: Merchant,
        fraud_score: u8,
        definition: WorkflowDefinition,
    ) -> Result<Self> {
        let partner = Arc::new(partner);
        let events = Arc::new(RecordingEventPublisher::new());
        let vault = Arc::new(InMemoryTokenVault::new());
        let collaborators = Collaborators {
            partner: partner.clone(),
            merchants: Arc::new(InMemoryMerchantStore::with_merchants([merchant]).await),
            token_vault: vault.clone(),
            events: events.clone(),
            fraud_scorer: Arc::new(FixedFraudScorer(fraud_score)),
            redirect: Arc::new(redirect()),
        };
        let orchestrator = PaymentOrchestrator::new(
            ActionRegistry::with_default_actions(collaborators),
            definition,
            OrchestratorConfig::default(),
        )?;
        Ok(Self {
            partner,
            events,
            vault,
            orchestrator,
        })
    }
}
