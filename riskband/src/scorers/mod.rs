// riskband/src/scorers/mod.rs
//
// Scoring strategies. Each one is fitted once over the whole table, then
// replayed over every account window; all three share the same driver.
//
//   Endpoint  — browsing endpoint consistency, regularised by global rareness
//   Shipping  — fixed-weight shipping / billing address consistency
//   Purchase  — cart amount band + product type overlap with recent carts

pub mod endpoint;
pub mod purchase;
pub mod shipping;

use tracing::debug;

use crate::error::ScoreError;
use crate::records::{ScorerKind, ScorerOutput, Transaction};
use crate::state::window::{AccountTimeline, AccountWindow};

/// Applied when the window holds exactly one prior transaction.
pub const SHORT_HISTORY_DISCOUNT: f64 = 0.75;

pub trait Scorer: Send + Sync {
    fn kind(&self) -> ScorerKind;

    /// Build the immutable state `score_window` reads from.
    fn fit(&self, transactions: &[Transaction]) -> Box<dyn FittedScorer>;
}

pub trait FittedScorer: Send + Sync {
    fn kind(&self) -> ScorerKind;

    /// Score in 0..=1 for the window's current transaction. Windows of size 1
    /// always score 1.0.
    fn score_window(&self, window: &AccountWindow<'_>) -> Result<f64, ScoreError>;
}

/// Run a fitted scorer over every account window of the table. Output follows
/// (account, time) order; `index` restores input order downstream.
pub fn score_all(
    scorer:       &dyn FittedScorer,
    transactions: &[Transaction],
) -> Result<Vec<ScorerOutput>, ScoreError> {
    let timeline = AccountTimeline::new(transactions);
    let outputs = timeline
        .windows()
        .map(|window| {
            let score   = scorer.score_window(&window)?;
            let current = window.current();
            Ok(ScorerOutput {
                scorer:           scorer.kind(),
                index:            current.index,
                session_id:       current.session_id.clone(),
                account_id:       current.account_id.clone(),
                score:            score * 100.0,
                num_transactions: window.size(),
                fraud_list_entry: current.fraud_list_entry,
                fraud_discount:   current.fraud_discount,
            })
        })
        .collect::<Result<Vec<_>, ScoreError>>()?;

    debug!("{} scored {} windows", scorer.kind(), outputs.len());
    Ok(outputs)
}

/// Weighted mean of `(value, weight)` pairs. Falls back to the plain mean when
/// every weight is zero; `None` for no pairs.
pub(crate) fn weighted_average(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let total: f64 = pairs.iter().map(|(_, w)| w).sum();
    if total > 0.0 {
        Some(pairs.iter().map(|(v, w)| v * w).sum::<f64>() / total)
    } else {
        Some(pairs.iter().map(|(v, _)| v).sum::<f64>() / pairs.len() as f64)
    }
}

pub(crate) fn discount_short_history(score: f64, window_size: usize) -> f64 {
    if window_size == 2 { score * SHORT_HISTORY_DISCOUNT } else { score }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::tx;
    use crate::scorers::shipping::ShippingScorer;

    #[test]
    fn weighted_average_variants() {
        assert_eq!(weighted_average(&[]), None);
        assert_eq!(weighted_average(&[(1.0, 3.0), (0.0, 1.0)]), Some(0.75));
        assert_eq!(weighted_average(&[(1.0, 0.0), (0.5, 0.0)]), Some(0.75));
    }

    #[test]
    fn short_history_discount_only_at_two() {
        assert_eq!(discount_short_history(0.8, 2), 0.8 * 0.75);
        assert_eq!(discount_short_history(0.8, 3), 0.8);
    }

    #[test]
    fn driver_emits_one_output_per_row() {
        let txs = vec![tx(0, "b", 2), tx(1, "a", 1), tx(2, "b", 1)];
        let fitted = ShippingScorer::default().fit(&txs);
        let out = score_all(fitted.as_ref(), &txs).unwrap();

        assert_eq!(out.len(), 3);
        let first_b = out.iter().find(|o| o.index == 2).unwrap();
        assert_eq!(first_b.num_transactions, 1);
        assert_eq!(first_b.score, 100.0);
        let second_b = out.iter().find(|o| o.index == 0).unwrap();
        assert_eq!(second_b.num_transactions, 2);
        assert!(out.iter().all(|o| o.scorer == ScorerKind::Shipping));
    }
}
