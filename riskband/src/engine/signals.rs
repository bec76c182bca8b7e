// riskband/src/engine/signals.rs
//
// Post-fusion deduction from externally computed behavioural signal tags.
//
// The raw cell looks like `["geo_anonymous","login_failure"]`. Tags outside
// the known set are dropped silently.
//
// Deduction policy:
//   geo_anonymous alone               → × 0.6
//   geo_anonymous + any other signal  → × 0.5
//   otherwise                         → × max(0.6, 1 − 0.1 × n)
//
// geo_anonymous together with any other signal is the only combination
// allowed below the 0.6 floor.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::records::{risk_band, ScoreRecord, Transaction};

const DEDUCTION_FLOOR:      f64 = 0.6;
const GEO_ANONYMOUS_ALONE:  f64 = 0.6;
const GEO_ANONYMOUS_COMBO:  f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    AccountCreateVelocity,
    AccountTesting,
    EventVelocity,
    GeoAnonymous,
    InputAnomaly,
    InputScripted,
    LoginAccounts,
    LoginFailure,
    LoginVelocity,
    NetAnomalyIp,
    NetAnomalyUa,
    ShipToBillDistance,
}

impl Signal {
    pub const ALL: [Signal; 12] = [
        Self::AccountCreateVelocity,
        Self::AccountTesting,
        Self::EventVelocity,
        Self::GeoAnonymous,
        Self::InputAnomaly,
        Self::InputScripted,
        Self::LoginAccounts,
        Self::LoginFailure,
        Self::LoginVelocity,
        Self::NetAnomalyIp,
        Self::NetAnomalyUa,
        Self::ShipToBillDistance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountCreateVelocity => "account_create_velocity",
            Self::AccountTesting => "account_testing",
            Self::EventVelocity => "event_velocity",
            Self::GeoAnonymous => "geo_anonymous",
            Self::InputAnomaly => "input_anomaly",
            Self::InputScripted => "input_scripted",
            Self::LoginAccounts => "login_accounts",
            Self::LoginFailure => "login_failure",
            Self::LoginVelocity => "login_velocity",
            Self::NetAnomalyIp => "net_anomaly_ip",
            Self::NetAnomalyUa => "net_anomaly_ua",
            Self::ShipToBillDistance => "shiptobill_distance",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == tag)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known signals in a raw `["a","b"]` cell. Anything unrecognised is dropped.
pub fn parse_signal_tags(raw: &str) -> BTreeSet<Signal> {
    let inner = raw.trim();
    let inner = inner.strip_prefix('[').unwrap_or(inner);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    inner
        .split(',')
        .map(|tag| tag.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter_map(Signal::from_tag)
        .collect()
}

pub fn deduction(signals: &BTreeSet<Signal>) -> f64 {
    let n = signals.len();
    if signals.contains(&Signal::GeoAnonymous) {
        if n > 1 { GEO_ANONYMOUS_COMBO } else { GEO_ANONYMOUS_ALONE }
    } else {
        // 1 − 0.1 × n, kept in tenths so 3 signals give exactly 0.7
        let tenths = 10usize.saturating_sub(n) as f64 / 10.0;
        tenths.max(DEDUCTION_FLOOR)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalAdjuster;

impl SignalAdjuster {
    /// Apply the signals in `raw` to one record; returns the deduction used.
    pub fn adjust(&self, record: &mut ScoreRecord, raw: &str) -> f64 {
        let signals = parse_signal_tags(raw);
        let factor  = deduction(&signals);

        record.signals_triggered.extend(signals.iter().map(|s| s.to_string()));
        record.final_score *= factor;
        record.final_band   = risk_band(record.final_score);

        if !signals.is_empty() {
            debug!("session={} signals={} deduction={:.2}",
                   record.session_id, signals.len(), factor);
        }
        factor
    }

    /// Adjust every record with the signal cell of the transaction it came from.
    pub fn adjust_all(&self, records: &mut [ScoreRecord], transactions: &[Transaction]) {
        let raw_by_index: HashMap<usize, &str> = transactions
            .iter()
            .map(|t| (t.index, t.raw_signals.as_str()))
            .collect();
        for record in records.iter_mut() {
            let raw = raw_by_index.get(&record.index).copied().unwrap_or("");
            self.adjust(record, raw);
        }
    }
}
