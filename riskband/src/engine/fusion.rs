// riskband/src/engine/fusion.rs
//
// Weighted score fusion with fraud discount + linear risk band.
//
// Default weight distribution across the three scorers (sum = 1.00):
//   Endpoint  0.25  — browsing endpoint consistency
//   Shipping  0.50  — shipping / billing address consistency
//   Purchase  0.25  — cart band + product type overlap
//
//   finalScore = Σ(score_i × w_i × fraudDiscount) / Σ w_i
//   finalBand  = 1 + 4 × (1 − finalScore / 100)

use std::collections::BTreeMap;

use tracing::info;

use crate::error::ScoreError;
use crate::records::{risk_band, ScoreRecord, ScorerKind, Transaction};
use crate::scorers::{score_all, Scorer};

pub const DEFAULT_WEIGHTS: &[(ScorerKind, f64)] = &[
    (ScorerKind::Endpoint, 0.25),
    (ScorerKind::Shipping, 0.50),
    (ScorerKind::Purchase, 0.25),
];

pub const FRAUDULENT_IP_SIGNAL: &str = "Fraudulent IP";

pub fn default_weight(kind: ScorerKind) -> f64 {
    DEFAULT_WEIGHTS.iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

struct Estimator {
    scorer: Box<dyn Scorer>,
    weight: f64,
}

#[derive(Default)]
pub struct ModelMerger {
    estimators: Vec<Estimator>,
}

impl ModelMerger {
    pub fn new() -> Self { Self::default() }

    /// Add a scorer; replaces any earlier scorer of the same kind.
    pub fn with(mut self, scorer: impl Scorer + 'static, weight: f64) -> Self {
        let kind = scorer.kind();
        self.estimators.retain(|e| e.scorer.kind() != kind);
        self.estimators.push(Estimator { scorer: Box::new(scorer), weight });
        self
    }

    pub fn kinds(&self) -> Vec<ScorerKind> {
        let mut kinds: Vec<ScorerKind> = self.estimators.iter().map(|e| e.scorer.kind()).collect();
        kinds.sort();
        kinds
    }

    pub fn is_empty(&self) -> bool { self.estimators.is_empty() }

    /// Fit every scorer on `transactions`, score every row, and fuse. Records
    /// come back in input order.
    pub fn run(&self, transactions: &[Transaction]) -> Result<Vec<ScoreRecord>, ScoreError> {
        if self.estimators.is_empty() {
            return Err(ScoreError::NoScorers);
        }

        // Canonical order: the sum does not depend on how scorers were added
        let mut ordered: Vec<&Estimator> = self.estimators.iter().collect();
        ordered.sort_by_key(|e| e.scorer.kind());

        let total_weight: f64 = ordered.iter().map(|e| e.weight).sum();
        if !(total_weight.is_finite() && total_weight > 0.0) {
            return Err(ScoreError::InvalidWeights(total_weight));
        }

        let mut records: BTreeMap<usize, ScoreRecord> = BTreeMap::new();
        for est in &ordered {
            let fitted  = est.scorer.fit(transactions);
            let outputs = score_all(fitted.as_ref(), transactions)?;
            info!("{} scorer: {} rows (weight {:.2})", est.scorer.kind(), outputs.len(), est.weight);

            for out in outputs {
                let record = records.entry(out.index).or_insert_with(|| ScoreRecord {
                    index:             out.index,
                    session_id:        out.session_id.clone(),
                    account_id:        out.account_id.clone(),
                    scores:            BTreeMap::new(),
                    num_transactions:  out.num_transactions,
                    fraud_list_entry:  out.fraud_list_entry,
                    fraud_discount:    out.fraud_discount,
                    final_score:       0.0,
                    final_band:        0.0,
                    signals_triggered: Vec::new(),
                });
                record.final_score += out.score * est.weight * out.fraud_discount;
                record.scores.insert(out.scorer, out.score);
            }
        }

        let mut fused = Vec::with_capacity(records.len());
        for mut record in records.into_values() {
            record.final_score /= total_weight;
            record.final_band = risk_band(record.final_score);
            if record.fraud_discount != 1.0 {
                record.signals_triggered.push(FRAUDULENT_IP_SIGNAL.to_string());
            }
            fused.push(record);
        }
        Ok(fused)
    }
}
