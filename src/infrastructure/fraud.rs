use crate::domain::payment::Payment;
use crate::domain::ports::FraudScorer;
use rand::Rng;

/// Demo scorer drawing a uniform 0-99 score per payment.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomFraudScorer;

impl FraudScorer for RandomFraudScorer {
    fn score(&self, _payment: &Payment) -> u8 {
        rand::thread_rng().gen_range(0..100)
    }
}

/// Scorer returning the same score for every payment.
#[derive(Debug, Clone, Copy)]
pub struct FixedFraudScorer(pub u8);

impl FraudScorer for FixedFraudScorer {
    fn score(&self, _payment: &Payment) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Amount;
    use rust_decimal_macros::dec;

    #[test]
    fn test_random_scores_stay_in_range() {
        let payment = Payment::new(Amount::new(dec!(1)).unwrap(), "EUR");
        let scorer = RandomFraudScorer;
        for _ in 0..1000 {
            assert!(scorer.score(&payment) < 100);
        }
    }
}
