// riskband/src/scorers/purchase.rs
//
// Purchase scorer — cart size and product mix against the account's history.
//
//   amount band   — frequency of the current cart's size band (s/m/l/xl) over
//                   the whole window, relative to the most common band  (×2.0)
//   type overlap  — share of the current cart's product types already bought
//                   within the last `lookback` carts                      (×1.5)
//
// The sum is divided by 4.5, so a perfectly consistent purchase tops out at
// 3.5 / 4.5 of the scale.

use std::collections::{BTreeSet, HashMap};

use crate::error::ScoreError;
use crate::records::{AmountBand, ScorerKind, Transaction};
use crate::scorers::{discount_short_history, FittedScorer, Scorer};
use crate::state::window::AccountWindow;

pub const DEFAULT_LOOKBACK: usize = 10;

const AMOUNT_WEIGHT: f64 = 2.0;
const TYPE_WEIGHT:   f64 = 1.5;
const NORMALISER:    f64 = 4.5;

#[derive(Debug, Clone)]
pub struct PurchaseScorer {
    lookback: usize,
}

impl PurchaseScorer {
    pub fn new() -> Self {
        Self { lookback: DEFAULT_LOOKBACK }
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    fn amount_match(window: &AccountWindow<'_>) -> f64 {
        let mut counts: HashMap<AmountBand, usize> = HashMap::new();
        for t in window.rows() {
            *counts.entry(t.cart.amount_band()).or_default() += 1;
        }
        let max     = counts.values().copied().max().unwrap_or(0);
        let current = counts.get(&window.current().cart.amount_band()).copied().unwrap_or(0);
        if max == 0 { 0.0 } else { current as f64 / max as f64 }
    }

    fn type_overlap(&self, window: &AccountWindow<'_>) -> f64 {
        let recent  = window.tail(self.lookback + 1);
        let current = &recent.current().cart.product_types;
        if current.is_empty() {
            return 0.0;
        }
        let seen: BTreeSet<&str> = recent
            .history()
            .iter()
            .flat_map(|t| t.cart.product_types.iter().map(String::as_str))
            .collect();
        let shared = current.iter().filter(|p| seen.contains(p.as_str())).count();
        shared as f64 / current.len() as f64
    }
}

impl Default for PurchaseScorer { fn default() -> Self { Self::new() } }

impl Scorer for PurchaseScorer {
    fn kind(&self) -> ScorerKind { ScorerKind::Purchase }

    fn fit(&self, _transactions: &[Transaction]) -> Box<dyn FittedScorer> {
        Box::new(self.clone())
    }
}

impl FittedScorer for PurchaseScorer {
    fn kind(&self) -> ScorerKind { ScorerKind::Purchase }

    fn score_window(&self, window: &AccountWindow<'_>) -> Result<f64, ScoreError> {
        if window.size() <= 1 {
            return Ok(1.0);
        }
        let score = (AMOUNT_WEIGHT * Self::amount_match(window)
            + TYPE_WEIGHT * self.type_overlap(window))
            / NORMALISER;
        Ok(discount_short_history(score, window.size()))
    }
}
