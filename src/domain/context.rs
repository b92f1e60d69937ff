use crate::domain::merchant::{Merchant, PartnerConfig};
use crate::domain::operation::{CaptureOperation, RefundOperation, VoidOperation};
use crate::domain::payment::Payment;
use crate::workflow::definition::ActionName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata of the inbound call that started the workflow.
///
/// Headers are forwarded as-is on every outbound collaborator call so the
/// downstream services can authenticate the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub merchant_id: Option<String>,
    /// Partner resolved upstream; overrides the merchant's default partner.
    #[serde(default)]
    pub partner: Option<PartnerConfig>,
}

impl RequestMeta {
    /// Creates empty request metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header forwarded to every collaborator call.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Names the merchant used when the payment carries none.
    pub fn with_merchant(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }
}

/// Per-execution retry ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_authorize_attempts: u32,
    pub max_capture_attempts: u32,
    pub max_refund_attempts: u32,
    pub max_void_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_authorize_attempts: 1,
            max_capture_attempts: 5,
            max_refund_attempts: 5,
            max_void_attempts: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FraudAdvice {
    Approve,
    Challenge,
    Reject,
}

impl FraudAdvice {
    /// Maps a 0-99 score: below 50 approves, below 75 challenges, otherwise rejects.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..50 => FraudAdvice::Approve,
            50..75 => FraudAdvice::Challenge,
            _ => FraudAdvice::Reject,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAssessment {
    pub require_pre_authentication: bool,
    pub require_post_authorization: bool,
    pub score: Option<u8>,
    pub advice: Option<FraudAdvice>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationState {
    pub done: bool,
    pub skip: bool,
}

/// Shopper returning from a partner redirect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub partner_name: String,
    #[serde(default)]
    pub url_params: BTreeMap<String, String>,
}

/// Mutable execution state threaded through one workflow run.
///
/// Serialized to JSON for condition evaluation, so field names are the paths
/// workflow conditions refer to (`payment.status`, `fraud.advice`,
/// `authorizeAttempts`, `config.maxAuthorizeAttempts`, ...).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentContext {
    pub payment: Payment,
    pub merchant: Merchant,
    #[serde(skip)]
    pub request: RequestMeta,
    pub partner: PartnerConfig,
    pub authorize_attempts: u32,
    pub capture_attempts: u32,
    pub refund_attempts: u32,
    pub void_attempts: u32,
    pub config: RetryConfig,
    pub fraud: FraudAssessment,
    pub capture: Option<CaptureOperation>,
    pub refund: Option<RefundOperation>,
    pub void: Option<VoidOperation>,
    pub authentication: AuthenticationState,
    pub confirmation: Option<Confirmation>,
    /// Set by an action that wants the run to stop after it.
    pub halt_requested: bool,
    /// Actions run so far, in order.
    pub executed: Vec<ActionName>,
}

impl PaymentContext {
    /// Creates the context for one run.
    ///
    /// The partner comes from the request when given, else from the merchant;
    /// fraud and authentication flags come from the merchant settings.
    pub fn new(payment: Payment, merchant: Merchant, request: RequestMeta) -> Self {
        let partner = request
            .partner
            .clone()
            .unwrap_or_else(|| merchant.partner.clone());
        let fraud = FraudAssessment {
            require_pre_authentication: merchant.fraud.pre_authentication,
            require_post_authorization: merchant.fraud.post_authorization,
            ..FraudAssessment::default()
        };
        let authentication = AuthenticationState {
            done: false,
            skip: !merchant.authentication_enabled,
        };
        Self {
            payment,
            merchant,
            request,
            partner,
            authorize_attempts: 0,
            capture_attempts: 0,
            refund_attempts: 0,
            void_attempts: 0,
            config: RetryConfig::default(),
            fraud,
            capture: None,
            refund: None,
            void: None,
            authentication,
            confirmation: None,
            halt_requested: false,
            executed: Vec::new(),
        }
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.request.headers
    }

    /// Stops the run after the current action, whatever the graph says.
    pub fn halt(&mut self, reason: impl Into<String>) {
        self.halt_requested = true;
        self.payment.refusal_reason = Some(reason.into());
    }

    /// Zeroes every attempt counter.
    pub fn reset_attempts(&mut self) {
        self.authorize_attempts = 0;
        self.capture_attempts = 0;
        self.refund_attempts = 0;
        self.void_attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merchant::FraudSettings;
    use crate::domain::payment::Amount;
    use rust_decimal_macros::dec;

    fn merchant() -> Merchant {
        Merchant::new("m-1", "Shop", PartnerConfig::new("adyen"))
    }

    #[test]
    fn test_fraud_advice_thresholds() {
        assert_eq!(FraudAdvice::from_score(0), FraudAdvice::Approve);
        assert_eq!(FraudAdvice::from_score(49), FraudAdvice::Approve);
        assert_eq!(FraudAdvice::from_score(50), FraudAdvice::Challenge);
        assert_eq!(FraudAdvice::from_score(74), FraudAdvice::Challenge);
        assert_eq!(FraudAdvice::from_score(75), FraudAdvice::Reject);
        assert_eq!(FraudAdvice::from_score(99), FraudAdvice::Reject);
    }

    #[test]
    fn test_context_takes_flags_from_merchant() {
        let mut merchant = merchant();
        merchant.authentication_enabled = true;
        merchant.fraud = FraudSettings {
            pre_authentication: true,
            post_authorization: false,
        };
        let payment = Payment::new(Amount::new(dec!(10)).unwrap(), "EUR");

        let ctx = PaymentContext::new(payment, merchant, RequestMeta::new());
        assert!(ctx.fraud.require_pre_authentication);
        assert!(!ctx.fraud.require_post_authorization);
        assert!(!ctx.authentication.skip);
        assert_eq!(ctx.partner.name, "adyen");
    }

    #[test]
    fn test_request_partner_overrides_merchant_default() {
        let payment = Payment::new(Amount::new(dec!(10)).unwrap(), "EUR");
        let mut request = RequestMeta::new();
        request.partner = Some(PartnerConfig::new("stripe"));

        let ctx = PaymentContext::new(payment, merchant(), request);
        assert_eq!(ctx.partner.name, "stripe");
    }

    #[test]
    fn test_context_serializes_condition_paths() {
        let payment = Payment::new(Amount::new(dec!(10)).unwrap(), "EUR");
        let ctx = PaymentContext::new(payment, merchant(), RequestMeta::new());
        let value = serde_json::to_value(&ctx).unwrap();

        assert_eq!(value["payment"]["status"], "INITIATED");
        assert_eq!(value["authorizeAttempts"], 0);
        assert_eq!(value["config"]["maxCaptureAttempts"], 5);
        assert_eq!(value["authentication"]["skip"], true);
        assert!(value["fraud"]["advice"].is_null());
        assert!(value.get("request").is_none());
    }
}
