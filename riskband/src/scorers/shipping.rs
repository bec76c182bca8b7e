// riskband/src/scorers/shipping.rs
//
// Shipping scorer — weighted consistency of the shipping / billing address.
//
// Each field scores the probability of the current value in the account's
// history divided by the probability of its most common value. Users who
// legitimately alternate between two addresses are therefore not penalised
// for either of them. Weights are fixed; there is nothing to fit.

use crate::error::ScoreError;
use crate::records::{ScorerKind, ShippingField, Transaction};
use crate::scorers::{discount_short_history, weighted_average, FittedScorer, Scorer};
use crate::state::frequency::FeatureFrequencyTable;
use crate::state::window::AccountWindow;

pub const SHIPPING_WEIGHTS: &[(ShippingField, f64)] = &[
    (ShippingField::Country,    2.0),
    (ShippingField::Zipcode,    2.0),
    (ShippingField::Street,     1.0),
    (ShippingField::State,      2.5),
    (ShippingField::Phone,      0.5),
    (ShippingField::FirstName,  0.5),
    (ShippingField::LastName,   0.5),
    (ShippingField::BillingZip, 1.0),
];

#[derive(Debug, Clone, Default)]
pub struct ShippingScorer;

impl Scorer for ShippingScorer {
    fn kind(&self) -> ScorerKind { ScorerKind::Shipping }

    fn fit(&self, _transactions: &[Transaction]) -> Box<dyn FittedScorer> {
        Box::new(self.clone())
    }
}

impl FittedScorer for ShippingScorer {
    fn kind(&self) -> ScorerKind { ScorerKind::Shipping }

    fn score_window(&self, window: &AccountWindow<'_>) -> Result<f64, ScoreError> {
        if window.size() <= 1 {
            return Ok(1.0);
        }
        let current = window.current();
        let user = FeatureFrequencyTable::build(
            window.rows(),
            SHIPPING_WEIGHTS.iter().map(|(field, _)| *field),
            |t, field| t.shipping.get(*field),
        );

        let probs: Vec<(f64, f64)> = SHIPPING_WEIGHTS
            .iter()
            .filter_map(|(field, weight)| {
                let value = current.shipping.get(*field)?;
                Some((user.relative(field, value), *weight))
            })
            .collect();

        let score = weighted_average(&probs).ok_or_else(|| ScoreError::NoEligibleFeatures {
            scorer:     ScorerKind::Shipping,
            session_id: current.session_id.clone(),
            account_id: current.account_id.clone(),
        })?;
        Ok(discount_short_history(score, window.size()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ShippingInfo;
    use crate::scorers::test_support::tx;
    use crate::state::window::AccountTimeline;

    fn address(country: &str) -> ShippingInfo {
        ShippingInfo {
            country:     Some(country.into()),
            zipcode:     Some("94107".into()),
            street:      "1 Main St ".into(),
            state:       Some("CA".into()),
            phone:       Some("555-0100".into()),
            first_name:  Some("Sam".into()),
            last_name:   Some("Lee".into()),
            billing_zip: Some("94107".into()),
        }
    }

    fn shipped(index: usize, account: &str, secs: i64, info: ShippingInfo) -> Transaction {
        let mut t = tx(index, account, secs);
        t.shipping = info;
        t
    }

    fn last_score(txs: &[Transaction]) -> f64 {
        let timeline = AccountTimeline::new(txs);
        let window = timeline.windows().last().unwrap();
        ShippingScorer.score_window(&window).unwrap()
    }

    #[test]
    fn weights_sum_to_ten() {
        let total: f64 = SHIPPING_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert_eq!(total, 10.0);
    }

    #[test]
    fn identical_history_is_perfect() {
        let txs: Vec<Transaction> = (0..3)
            .map(|i| shipped(i, "a", i as i64, address("US")))
            .collect();
        assert_eq!(last_score(&txs), 1.0);
    }

    #[test]
    fn two_alternating_countries_are_not_penalised() {
        let txs = vec![
            shipped(0, "a", 1, address("US")),
            shipped(1, "a", 2, address("CA")),
        ];
        // CA and US are equally frequent → every field scores 1, then × 0.75
        assert_eq!(last_score(&txs), 0.75);
    }

    #[test]
    fn minority_country_scores_its_relative_frequency() {
        let txs = vec![
            shipped(0, "a", 1, address("US")),
            shipped(1, "a", 2, address("US")),
            shipped(2, "a", 3, address("CA")),
        ];
        // country: (1/3) / (2/3) = 0.5 at weight 2; the other 8 weight units score 1
        let score = last_score(&txs);
        assert!((score - 0.9).abs() < 1e-12);
    }

    #[test]
    fn null_fields_drop_out_of_the_average() {
        let mut sparse = address("US");
        sparse.phone = None;
        sparse.billing_zip = None;
        let txs = vec![
            shipped(0, "a", 1, address("US")),
            shipped(1, "a", 2, address("US")),
            shipped(2, "a", 3, sparse),
        ];
        assert_eq!(last_score(&txs), 1.0);
    }

    #[test]
    fn empty_payloads_still_score_through_street() {
        let txs = vec![
            shipped(0, "a", 1, ShippingInfo::default()),
            shipped(1, "a", 2, ShippingInfo::default()),
            shipped(2, "a", 3, ShippingInfo::default()),
        ];
        assert_eq!(last_score(&txs), 1.0);
    }
}
