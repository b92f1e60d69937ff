use super::Step;
use crate::domain::context::{FraudAdvice, PaymentContext};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::FraudScorerRef;
use crate::error::Result;
use crate::workflow::definition::ActionName;
use async_trait::async_trait;
use tracing::info;

/// Scores the payment and records the resulting advice on the context.
pub struct FraudScore {
    scorer: FraudScorerRef,
}

impl FraudScore {
    pub fn new(scorer: FraudScorerRef) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl Step for FraudScore {
    fn name(&self) -> ActionName {
        ActionName::FraudScore
    }

    async fn execute(&self, ctx: &mut PaymentContext) -> Result<()> {
        let score = self.scorer.score(&ctx.payment).min(99);
        let advice = FraudAdvice::from_score(score);
        ctx.fraud.score = Some(score);
        ctx.fraud.advice = Some(advice);
        info!(payment_id = %ctx.payment.id, score, ?advice, "fraud screening done");

        // Once authorized, a rejection is handled by voiding or refunding.
        let pre_authorization = matches!(
            ctx.payment.status,
            PaymentStatus::Initiated | PaymentStatus::AuthorizationPending
        );
        if advice == FraudAdvice::Reject && pre_authorization {
            ctx.payment.status = PaymentStatus::Refused;
            ctx.payment.refusal_reason = Some("Rejected by fraud screening".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::RequestMeta;
    use crate::domain::merchant::{Merchant, PartnerConfig};
    use crate::domain::payment::{Amount, Payment};
    use crate::infrastructure::fraud::FixedFraudScorer;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn context(status: PaymentStatus) -> PaymentContext {
        let payment = Payment::new(Amount::new(dec!(10)).unwrap(), "EUR").with_status(status);
        let merchant = Merchant::new("m-1", "Shop", PartnerConfig::new("adyen"));
        PaymentContext::new(payment, merchant, RequestMeta::new())
    }

    #[tokio::test]
    async fn test_reject_before_authorization_refuses_payment() {
        let mut ctx = context(PaymentStatus::Initiated);
        FraudScore::new(Arc::new(FixedFraudScorer(80))).execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.fraud.score, Some(80));
        assert_eq!(ctx.fraud.advice, Some(FraudAdvice::Reject));
        assert_eq!(ctx.payment.status, PaymentStatus::Refused);
    }

    #[tokio::test]
    async fn test_reject_after_authorization_keeps_status() {
        let mut ctx = context(PaymentStatus::Authorized);
        FraudScore::new(Arc::new(FixedFraudScorer(99))).execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.fraud.advice, Some(FraudAdvice::Reject));
        assert_eq!(ctx.payment.status, PaymentStatus::Authorized);
    }

    #[tokio::test]
    async fn test_challenge_leaves_status_alone() {
        let mut ctx = context(PaymentStatus::Initiated);
        FraudScore::new(Arc::new(FixedFraudScorer(60))).execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.fraud.advice, Some(FraudAdvice::Challenge));
        assert_eq!(ctx.payment.status, PaymentStatus::Initiated);
    }
}
