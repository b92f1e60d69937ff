use crate::domain::context::Confirmation;
use crate::domain::merchant::PartnerConfig;
use crate::domain::operation::{
    CaptureOperation, CaptureStatus, RefundOperation, RefundStatus, VoidOperation, VoidStatus,
};
use crate::domain::payment::{Payment, PaymentAction, PaymentStatus};
use crate::domain::ports::{Headers, PartnerCommunicator};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

/// Card ending that the simulator always declines.
pub const DECLINED_CARD_LAST4: &str = "0002";
/// Card ending that the simulator always sends through a 3-D Secure challenge.
pub const CHALLENGE_CARD_LAST4: &str = "3220";

/// Partner communicator with scripted outcomes, for local runs and demos.
///
/// Authorization and authentication outcomes depend on the card; captures
/// succeed with the configured probability.
#[derive(Debug, Clone)]
pub struct SimulatedPartner {
    capture_success_rate: f64,
}

impl SimulatedPartner {
    /// Creates a partner accepting captures with the given probability.
    ///
    /// Out-of-range rates are clamped to 0..=1; NaN counts as 0.
    pub fn new(capture_success_rate: f64) -> Self {
        let capture_success_rate = if capture_success_rate.is_nan() {
            0.0
        } else {
            capture_success_rate.clamp(0.0, 1.0)
        };
        Self {
            capture_success_rate,
        }
    }

    fn last4(payment: &Payment) -> Option<&str> {
        payment.tokenized_card().map(|card| card.last4.as_str())
    }

    fn reference() -> String {
        format!("sim_{}", Uuid::new_v4().simple())
    }
}

impl Default for SimulatedPartner {
    fn default() -> Self {
        Self::new(0.9)
    }
}

#[async_trait]
impl PartnerCommunicator for SimulatedPartner {
    async fn authenticate_payment(
        &self,
        _headers: &Headers,
        partner_name: &str,
        payment: &Payment,
        _partner_config: &PartnerConfig,
    ) -> Result<Payment> {
        let mut result = payment.clone();
        if Self::last4(payment) == Some(CHALLENGE_CARD_LAST4) {
            debug!(partner = partner_name, payment_id = %payment.id, "challenge required");
            result.action = Some(PaymentAction {
                url: "https://acs.simulator.test/challenge".to_string(),
                method: "POST".to_string(),
                data: Some(json!({
                    "paymentId": payment.id,
                    "termUrl": payment.authentication.return_url,
                })),
            });
        } else {
            result.authentication.result = Some("AUTHENTICATED".to_string());
            result.authentication.reference = Some(Self::reference());
        }
        Ok(result)
    }

    async fn authorize_payment(
        &self,
        _headers: &Headers,
        _partner_name: &str,
        payment: &Payment,
        _partner_config: &PartnerConfig,
    ) -> Result<Payment> {
        let mut result = payment.clone();
        if Self::last4(payment) == Some(DECLINED_CARD_LAST4) {
            result.status = PaymentStatus::Refused;
            result.refusal_reason = Some("Card declined".to_string());
        } else {
            result.status = PaymentStatus::Authorized;
            result.refusal_reason = None;
            result.authorization.code = Some(format!("{:06}", rand::thread_rng().gen_range(0..1_000_000)));
            result.authorization.partner_reference = Some(Self::reference());
            result.authorization.authorized_at = Some(Utc::now());
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
        let mut result = capture.clone();
        if rand::thread_rng().gen_bool(self.capture_success_rate) {
            result.status = CaptureStatus::Captured;
            result.partner_reference = Some(Self::reference());
            result.refusal_reason = None;
        } else {
            result.status = CaptureStatus::CaptureFailed;
            result.refusal_reason = Some("Acquirer unavailable".to_string());
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
        let mut result = refund.clone();
        result.status = RefundStatus::Refunded;
        result.partner_reference = Some(Self::reference());
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
        let mut result = void.clone();
        result.status = VoidStatus::Voided;
        result.partner_reference = Some(Self::reference());
        Ok(result)
    }

    async fn confirm_payment(
        &self,
        _headers: &Headers,
        _partner_name: &str,
        payment: &Payment,
        confirmation: &Confirmation,
        _partner_config: &PartnerConfig,
    ) -> Result<Payment> {
        let mut result = payment.clone();
        result.action = None;
        if confirmation.url_params.get("result").map(String::as_str) == Some("failed") {
            result.status = PaymentStatus::Refused;
            result.refusal_reason = Some("Authentication failed".to_string());
        } else {
            result.authentication.result = Some("AUTHENTICATED".to_string());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::CardNetwork;
    use crate::domain::payment::{Amount, PaymentInstrument, TokenizedCard};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn payment(last4: &str) -> Payment {
        let mut payment = Payment::new(Amount::new(dec!(10)).unwrap(), "EUR");
        payment.instrument = Some(PaymentInstrument::TokenizedCard(TokenizedCard {
            token: "tok_1".to_string(),
            masked_number: format!("400000******{}", last4),
            bin: "400000".to_string(),
            last4: last4.to_string(),
            network: CardNetwork::Visa,
            expiry_month: 12,
            expiry_year: 2099,
            holder_name: None,
            issuer_name: None,
            country: None,
        }));
        payment
    }

    #[tokio::test]
    async fn test_authorize_by_card() {
        let partner = SimulatedPartner::default();
        let config = PartnerConfig::new("simulated");
        let headers = Headers::new();

        let ok = partner
            .authorize_payment(&headers, "simulated", &payment("1111"), &config)
            .await
            .unwrap();
        assert_eq!(ok.status, PaymentStatus::Authorized);
        assert!(ok.authorization.partner_reference.is_some());

        let declined = partner
            .authorize_payment(&headers, "simulated", &payment(DECLINED_CARD_LAST4), &config)
            .await
            .unwrap();
        assert_eq!(declined.status, PaymentStatus::Refused);
        assert_eq!(declined.refusal_reason.as_deref(), Some("Card declined"));
    }

    #[tokio::test]
    async fn test_challenge_card_requires_redirect() {
        let partner = SimulatedPartner::default();
        let config = PartnerConfig::new("simulated");
        let headers = Headers::new();

        let challenged = partner
            .authenticate_payment(&headers, "simulated", &payment(CHALLENGE_CARD_LAST4), &config)
            .await
            .unwrap();
        assert!(challenged.action.is_some());

        let frictionless = partner
            .authenticate_payment(&headers, "simulated", &payment("1111"), &config)
            .await
            .unwrap();
        assert!(frictionless.action.is_none());
        assert_eq!(frictionless.authentication.result.as_deref(), Some("AUTHENTICATED"));

        let confirmation = Confirmation {
            partner_name: "simulated".to_string(),
            url_params: BTreeMap::from([("result".to_string(), "failed".to_string())]),
        };
        let confirmed = partner
            .confirm_payment(&headers, "simulated", &challenged, &confirmation, &config)
            .await
            .unwrap();
        assert_eq!(confirmed.status, PaymentStatus::Refused);
    }

    #[tokio::test]
    async fn test_capture_success_rate_extremes() {
        let config = PartnerConfig::new("simulated");
        let headers = Headers::new();
        let capture = CaptureOperation::new(dec!(10));

        let always = SimulatedPartner::new(1.0);
        let never = SimulatedPartner::new(-3.0);
        let not_a_number = SimulatedPartner::new(f64::NAN);
        for _ in 0..20 {
            let nan = not_a_number
                .capture_payment(&headers, "simulated", &payment("1111"), &capture, &config)
                .await
                .unwrap();
            assert_eq!(nan.status, CaptureStatus::CaptureFailed);

            let ok = always
                .capture_payment(&headers, "simulated", &payment("1111"), &capture, &config)
                .await
                .unwrap();
            assert_eq!(ok.status, CaptureStatus::Captured);
            assert_eq!(ok.id, capture.id);

            let failed = never
                .capture_payment(&headers, "simulated", &payment("1111"), &capture, &config)
                .await
                .unwrap();
            assert_eq!(failed.status, CaptureStatus::CaptureFailed);
        }
    }
}
