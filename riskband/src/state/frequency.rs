// riskband/src/state/frequency.rs
//
// Empirical value frequencies over a transaction set.
//
// Frequencies are count(value) / |S|. Rows where the feature is null still
// count toward |S| but never appear as keys, so a feature's frequencies sum
// to the non-null share of S rather than to 1.

use std::collections::HashMap;
use std::hash::Hash;

use crate::records::Transaction;

pub type ValueFrequencies = HashMap<String, f64>;

pub fn value_frequencies<'a, I>(values: I) -> ValueFrequencies
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0usize;
    for value in values {
        total += 1;
        if let Some(v) = value {
            *counts.entry(v).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(v, c)| (v.to_string(), c as f64 / total as f64))
        .collect()
}

pub fn max_frequency(freqs: &ValueFrequencies) -> f64 {
    freqs.values().copied().fold(0.0, f64::max)
}

// ── Per-feature table ─────────────────────────────────────────────────────────

/// Feature → value → frequency, keyed by whatever names a scorer uses for its
/// features (endpoint column names, shipping fields, ...).
#[derive(Debug, Clone)]
pub struct FeatureFrequencyTable<K> {
    table: HashMap<K, ValueFrequencies>,
}

impl<K: Eq + Hash> FeatureFrequencyTable<K> {
    pub fn build<'t, F>(
        rows: &[&'t Transaction],
        features: impl IntoIterator<Item = K>,
        value: F,
    ) -> Self
    where
        F: Fn(&'t Transaction, &K) -> Option<&'t str>,
    {
        let table = features
            .into_iter()
            .map(|feature| {
                let freqs = value_frequencies(rows.iter().map(|t| value(*t, &feature)));
                (feature, freqs)
            })
            .collect();
        Self { table }
    }

    /// Empty when the feature was null on every row.
    pub fn get(&self, feature: &K) -> Option<&ValueFrequencies> {
        self.table.get(feature).filter(|f| !f.is_empty())
    }

    /// `freq[value] / max(freq)`; 0 for a value never observed.
    pub fn relative(&self, feature: &K, value: &str) -> f64 {
        match self.get(feature) {
            Some(freqs) => {
                let max = max_frequency(freqs);
                if max > 0.0 {
                    freqs.get(value).copied().unwrap_or(0.0) / max
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_count_toward_denominator() {
        let freqs = value_frequencies([Some("a"), Some("a"), Some("b"), None]);
        assert_eq!(freqs.len(), 2);
        assert_eq!(freqs["a"], 0.5);
        assert_eq!(freqs["b"], 0.25);
        assert_eq!(max_frequency(&freqs), 0.5);
    }

    #[test]
    fn all_null_feature_is_empty() {
        let freqs = value_frequencies([None, None]);
        assert!(freqs.is_empty());
        assert_eq!(max_frequency(&freqs), 0.0);
    }

    #[test]
    fn non_null_frequencies_sum_to_one() {
        let freqs = value_frequencies(["x", "y", "y", "z"].map(Some));
        let total: f64 = freqs.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
