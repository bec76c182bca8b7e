// riskband/src/scorers/endpoint.rs
//
// Endpoint scorer — browser, device and network consistency.
//
// Each feature scores the normalised probability of the current value in the
// account's own history (current value frequency over the most frequent
// value), so multimodal users are not punished. That is then regularised by
// how rare the value is across all accounts:
//
//   match = (uFreq / maxUFreq) × ((1 − p) + p × (1 − gFreq))
//
// where p is the universe prior. A user who always buys from the US and then
// buys from a country few accounts use loses more than one switching between
// two common countries.
//
// Features are weighted by relevance: features with many distinct, rarely
// shared values are informative; a feature with a single global value has
// zero weight.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::error::ScoreError;
use crate::records::{ScorerKind, Transaction};
use crate::scorers::{discount_short_history, weighted_average, FittedScorer, Scorer};
use crate::state::frequency::{max_frequency, FeatureFrequencyTable, ValueFrequencies};
use crate::state::window::AccountWindow;

pub const DEFAULT_UNIVERSE_PRIOR: f64 = 0.25;

/// Global frequency used for values never seen while fitting.
const EPSILON: f64 = 1e-10;

/// Structural columns that never act as features.
const SKIP_FEATURES: &[&str] = &["sessionid", "accountid", "unixtime", "_artificial_index_"];

pub const ENDPOINT_FEATURES: &[&str] = &[
    "browserlanguage", "useragent", "deviceid", "device_type",
    "browserplatform", "browserparent", "browsername",
    "device_pointing_method", "city", "country", "region", "ip",
];

/// Combined features, valued `a|||b`.
pub const FEATURE_PAIRS: &[(&str, &str)] = &[
    ("browserparent", "device_type"),
    ("browserparent", "browserplatform"),
    ("useragent",     "deviceid"),
    ("device_type",   "useragent"),
    ("device_type",   "device_pointing_method"),
    ("device_type",   "ip"),
    ("device_type",   "city"),
];

pub fn pair_name(a: &str, b: &str) -> String {
    format!("{}::{}", a, b)
}

pub fn pair_value(a: Option<&str>, b: Option<&str>) -> Option<String> {
    Some(format!("{}|||{}", a?, b?))
}

// ── Global frequency model ────────────────────────────────────────────────────

/// Per feature, the share of distinct (account, value) groups holding each
/// value. Counts accounts, not transactions.
#[derive(Debug, Clone, Default)]
pub struct GlobalFrequencyModel {
    features: BTreeMap<String, ValueFrequencies>,
}

impl GlobalFrequencyModel {
    pub fn fit(transactions: &[Transaction]) -> Self {
        let mut groups: BTreeMap<&str, HashSet<(&str, &str)>> = BTreeMap::new();
        for t in transactions {
            for (feature, value) in &t.endpoint {
                if SKIP_FEATURES.contains(&feature.as_str()) {
                    continue;
                }
                if let Some(v) = value {
                    groups.entry(feature.as_str()).or_default()
                        .insert((t.account_id.as_str(), v.as_str()));
                }
            }
        }

        let features = groups
            .into_iter()
            .map(|(feature, pairs)| {
                let n_groups = pairs.len() as f64;
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for (_, value) in pairs {
                    *counts.entry(value).or_default() += 1;
                }
                let freqs = counts
                    .into_iter()
                    .map(|(v, c)| (v.to_string(), c as f64 / n_groups))
                    .collect();
                (feature.to_string(), freqs)
            })
            .collect();

        Self { features }
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    pub fn frequencies(&self, feature: &str) -> Option<&ValueFrequencies> {
        self.features.get(feature)
    }

    pub fn frequency(&self, feature: &str, value: &str) -> Option<f64> {
        self.features.get(feature)?.get(value).copied()
    }

    pub fn len(&self) -> usize { self.features.len() }
    pub fn is_empty(&self) -> bool { self.features.is_empty() }
}

// ── Feature relevance ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct FeatureRelevanceTable {
    weights: BTreeMap<String, f64>,
}

impl FeatureRelevanceTable {
    /// `1 − mean(global frequencies)`, renormalised to sum to 1. When every
    /// feature is constant the mass is zero and relevance becomes uniform.
    pub fn from_model(model: &GlobalFrequencyModel) -> Self {
        let raw: BTreeMap<String, f64> = model
            .features
            .iter()
            .map(|(feature, freqs)| {
                let mean = freqs.values().sum::<f64>() / freqs.len() as f64;
                (feature.clone(), 1.0 - mean)
            })
            .collect();

        let total: f64 = raw.values().sum();
        let n = raw.len() as f64;
        let weights = raw
            .into_iter()
            .map(|(feature, r)| {
                let w = if total > 0.0 { r / total } else { 1.0 / n };
                (feature, w)
            })
            .collect();
        Self { weights }
    }

    pub fn get(&self, feature: &str) -> f64 {
        self.weights.get(feature).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(f, w)| (f.as_str(), *w))
    }
}

// ── Scorer ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EndpointScorer {
    universe_prior: f64,
}

impl EndpointScorer {
    pub fn new() -> Self {
        Self { universe_prior: DEFAULT_UNIVERSE_PRIOR }
    }

    pub fn with_universe_prior(mut self, prior: f64) -> Self {
        self.universe_prior = prior.clamp(0.0, 1.0);
        self
    }
}

impl Default for EndpointScorer { fn default() -> Self { Self::new() } }

impl Scorer for EndpointScorer {
    fn kind(&self) -> ScorerKind { ScorerKind::Endpoint }

    fn fit(&self, transactions: &[Transaction]) -> Box<dyn FittedScorer> {
        let global    = GlobalFrequencyModel::fit(transactions);
        let relevance = FeatureRelevanceTable::from_model(&global);
        info!("Endpoint model fitted: {} features over {} transactions",
              global.len(), transactions.len());
        for (feature, weight) in relevance.iter() {
            debug!("relevance {:<40} {:.4}", feature, weight);
        }
        Box::new(EndpointModel { global, relevance, universe_prior: self.universe_prior })
    }
}

/// Fitted endpoint state. Immutable once built.
#[derive(Debug, Clone)]
pub struct EndpointModel {
    pub global:         GlobalFrequencyModel,
    pub relevance:      FeatureRelevanceTable,
    pub universe_prior: f64,
}

impl FittedScorer for EndpointModel {
    fn kind(&self) -> ScorerKind { ScorerKind::Endpoint }

    fn score_window(&self, window: &AccountWindow<'_>) -> Result<f64, ScoreError> {
        if window.size() <= 1 {
            return Ok(1.0);
        }
        let current = window.current();

        // Null on the scored transaction → feature sits this one out
        let eligible: Vec<&str> = self.global.features()
            .filter(|f| current.feature(f).is_some())
            .collect();
        let user = FeatureFrequencyTable::build(
            window.rows(), eligible.iter().copied(), |t, f| t.feature(f));

        let p = self.universe_prior;
        let mut matches = Vec::with_capacity(eligible.len());
        for feature in &eligible {
            let (Some(value), Some(freqs)) = (current.feature(feature), user.get(feature)) else {
                continue;
            };
            let u_freq = freqs.get(value).copied().unwrap_or(0.0);
            let max_u  = max_frequency(freqs);
            let g_freq = self.global.frequency(feature, value).unwrap_or(EPSILON);

            let ft_match = (u_freq / max_u) * ((1.0 - p) + p * (1.0 - g_freq));
            matches.push((ft_match, self.relevance.get(feature)));
        }

        let score = weighted_average(&matches).ok_or_else(|| ScoreError::NoEligibleFeatures {
            scorer:     ScorerKind::Endpoint,
            session_id: current.session_id.clone(),
            account_id: current.account_id.clone(),
        })?;
        Ok(discount_short_history(score, window.size()))
    }
}
