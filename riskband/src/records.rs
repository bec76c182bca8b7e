// riskband/src/records.rs
//
// Shared record types flowing through riskband.
//
//   Transaction  — one input row, already split into typed sub-records
//   ScoreRecord  — merged per-transaction output, augmented by the adjuster
//   ScorerKind   — identity of a scoring strategy (also its output column)

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

// ── Transaction ───────────────────────────────────────────────────────────────

/// Named endpoint features. `None` is a null cell.
pub type FeatureMap = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone)]
pub struct Transaction {
    /// Position in the input table; restores output order.
    pub index: usize,
    pub session_id: String,
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub endpoint: FeatureMap,
    pub shipping: ShippingInfo,
    pub cart: CartInfo,
    /// Raw `eventtriggeredsignals` cell, parsed by the signal adjuster.
    pub raw_signals: String,
    pub fraud_list_entry: bool,
    pub fraud_discount: f64,
}

impl Transaction {
    pub fn new(
        index: usize,
        session_id: impl Into<String>,
        account_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            index,
            session_id: session_id.into(),
            account_id: account_id.into(),
            timestamp,
            endpoint: FeatureMap::new(),
            shipping: ShippingInfo::default(),
            cart: CartInfo::default(),
            raw_signals: String::new(),
            fraud_list_entry: false,
            fraud_discount: 1.0,
        }
    }

    /// Endpoint feature value, flattening "column absent" and "null" together.
    pub fn feature(&self, name: &str) -> Option<&str> {
        self.endpoint.get(name).and_then(|v| v.as_deref())
    }
}

// ── Shipping ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShippingInfo {
    pub country: Option<String>,
    pub zipcode: Option<String>,
    /// `street + " " + street2`; always present, even for empty payloads.
    pub street: String,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub billing_zip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShippingField {
    Country,
    Zipcode,
    Street,
    State,
    Phone,
    FirstName,
    LastName,
    BillingZip,
}

impl ShippingInfo {
    pub fn get(&self, field: ShippingField) -> Option<&str> {
        match field {
            ShippingField::Country => self.country.as_deref(),
            ShippingField::Zipcode => self.zipcode.as_deref(),
            ShippingField::Street => Some(self.street.as_str()),
            ShippingField::State => self.state.as_deref(),
            ShippingField::Phone => self.phone.as_deref(),
            ShippingField::FirstName => self.first_name.as_deref(),
            ShippingField::LastName => self.last_name.as_deref(),
            ShippingField::BillingZip => self.billing_zip.as_deref(),
        }
    }
}

impl std::fmt::Display for ShippingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Country => write!(f, "shippingcountry"),
            Self::Zipcode => write!(f, "shippingzipcode"),
            Self::Street => write!(f, "shippingstreet"),
            Self::State => write!(f, "shippingstate"),
            Self::Phone => write!(f, "shippingphonenumber"),
            Self::FirstName => write!(f, "shippingnamefirst"),
            Self::LastName => write!(f, "shippingnamelast"),
            Self::BillingZip => write!(f, "billingzipcode"),
        }
    }
}

// ── Cart ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartInfo {
    /// Σ price × quantity over line items.
    pub total_amount: f64,
    pub product_types: BTreeSet<String>,
}

/// Categorical cart size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AmountBand {
    S,  // < 800
    M,  // < 1000
    L,  // < 3000
    Xl,
}

impl CartInfo {
    pub fn amount_band(&self) -> AmountBand {
        let amount = self.total_amount;
        if amount < 800.0 {
            AmountBand::S
        } else if amount < 1000.0 {
            AmountBand::M
        } else if amount < 3000.0 {
            AmountBand::L
        } else {
            AmountBand::Xl
        }
    }
}

impl std::fmt::Display for AmountBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::S => write!(f, "s"),
            Self::M => write!(f, "m"),
            Self::L => write!(f, "l"),
            Self::Xl => write!(f, "xl"),
        }
    }
}

// ── Scoring types ─────────────────────────────────────────────────────────────

/// Declaration order is the canonical summation order used by the merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScorerKind {
    Endpoint, // browsing endpoint consistency vs. global rareness
    Shipping, // shipping / billing address consistency
    Purchase, // cart size band + product type overlap
}

impl ScorerKind {
    /// Output column carrying this scorer's score.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpointscore",
            Self::Shipping => "shippingscore",
            Self::Purchase => "purchasescore",
        }
    }
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Endpoint => write!(f, "endpoint"),
            Self::Shipping => write!(f, "shipping"),
            Self::Purchase => write!(f, "purchase"),
        }
    }
}

/// One scorer's output for one transaction, score already scaled to 0..=100.
#[derive(Debug, Clone)]
pub struct ScorerOutput {
    pub scorer: ScorerKind,
    pub index: usize,
    pub session_id: String,
    pub account_id: String,
    pub score: f64,
    pub num_transactions: usize,
    pub fraud_list_entry: bool,
    pub fraud_discount: f64,
}

#[derive(Debug, Clone)]
pub struct ScoreRecord {
    pub index: usize,
    pub session_id: String,
    pub account_id: String,
    pub scores: BTreeMap<ScorerKind, f64>,
    pub num_transactions: usize,
    pub fraud_list_entry: bool,
    pub fraud_discount: f64,
    pub final_score: f64,
    pub final_band: f64,
    pub signals_triggered: Vec<String>,
}

impl ScoreRecord {
    pub fn score(&self, scorer: ScorerKind) -> Option<f64> {
        self.scores.get(&scorer).copied()
    }

    pub fn signals_text(&self) -> String {
        self.signals_triggered.join(", ")
    }
}

/// Linear map from a 0..=100 score to a 1..=5 band; 1 is lowest risk.
pub fn risk_band(final_score: f64) -> f64 {
    1.0 + 4.0 * (1.0 - final_score / 100.0)
}
