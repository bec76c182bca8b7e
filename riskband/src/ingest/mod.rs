// riskband/src/ingest/mod.rs
//
// Delimited input table → Vec<Transaction>.
//
// Required columns:  sessionid, accountid, unixtime
// Endpoint columns:  any of ENDPOINT_FEATURES present in the header, plus the
//                    pair features whose two source columns are both present
// Payload columns:   shipping_info, cart_info (JSON, see payload.rs)
// Signal column:     eventtriggeredsignals (raw tag string)
//
// Header names are matched case-insensitively. An empty cell is a null.

pub mod payload;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::IngestError;
use crate::records::Transaction;
use crate::scorers::endpoint::{pair_name, pair_value, ENDPOINT_FEATURES, FEATURE_PAIRS};

pub use payload::{parse_cart, parse_shipping};

const SESSION_COLUMN:  &str = "sessionid";
const ACCOUNT_COLUMN:  &str = "accountid";
const TIME_COLUMN:     &str = "unixtime";
const SHIPPING_COLUMN: &str = "shipping_info";
const CART_COLUMN:     &str = "cart_info";
const SIGNALS_COLUMN:  &str = "eventtriggeredsignals";

/// Seconds since the epoch, integral or fractional.
pub fn parse_unixtime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    let secs = raw.parse::<f64>().ok().filter(|s| s.is_finite())?;
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Column positions resolved once from the header row.
struct Columns {
    index:    HashMap<String, usize>,
    session:  usize,
    account:  usize,
    time:     usize,
    features: Vec<(&'static str, usize)>,
    pairs:    Vec<(String, usize, usize)>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, IngestError> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        let require = |name: &'static str| {
            index.get(name).copied().ok_or(IngestError::MissingColumn(name))
        };
        let session = require(SESSION_COLUMN)?;
        let account = require(ACCOUNT_COLUMN)?;
        let time    = require(TIME_COLUMN)?;

        let features: Vec<(&'static str, usize)> = ENDPOINT_FEATURES
            .iter()
            .filter_map(|f| index.get(*f).map(|&i| (*f, i)))
            .collect();
        let pairs = FEATURE_PAIRS
            .iter()
            .filter_map(|(a, b)| Some((pair_name(a, b), *index.get(*a)?, *index.get(*b)?)))
            .collect();

        Ok(Self { index, session, account, time, features, pairs })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

fn cell<'r>(record: &'r csv::StringRecord, i: usize) -> &'r str {
    record.get(i).unwrap_or("")
}

fn non_empty(raw: &str) -> Option<&str> {
    let v = raw.trim();
    (!v.is_empty()).then_some(v)
}

// ── Reader ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct TableReader {
    delimiter: u8,
}

impl Default for TableReader {
    fn default() -> Self { Self { delimiter: b',' } }
}

impl TableReader {
    pub fn new(delimiter: char) -> Result<Self, IngestError> {
        if !delimiter.is_ascii() {
            return Err(IngestError::InvalidDelimiter(delimiter));
        }
        Ok(Self { delimiter: delimiter as u8 })
    }

    pub fn delimiter(&self) -> char { self.delimiter as char }

    pub fn parse(&self, content: &str) -> Result<Vec<Transaction>, IngestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let cols     = Columns::resolve(rdr.headers()?)?;
        let shipping = cols.optional(SHIPPING_COLUMN);
        let cart     = cols.optional(CART_COLUMN);
        let signals  = cols.optional(SIGNALS_COLUMN);
        debug!(
            features = cols.features.len(),
            pairs    = cols.pairs.len(),
            "resolved input columns"
        );

        let mut out = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let raw_time = cell(&record, cols.time);
            let timestamp = parse_unixtime(raw_time).ok_or_else(|| IngestError::InvalidTimestamp {
                row,
                value: raw_time.to_string(),
            })?;

            let mut tx = Transaction::new(
                row,
                cell(&record, cols.session).trim(),
                cell(&record, cols.account).trim(),
                timestamp,
            );
            for &(name, i) in &cols.features {
                tx.endpoint.insert(name.to_string(), non_empty(cell(&record, i)).map(String::from));
            }
            for (name, a, b) in &cols.pairs {
                let value = pair_value(non_empty(cell(&record, *a)), non_empty(cell(&record, *b)));
                tx.endpoint.insert(name.clone(), value);
            }
            tx.shipping    = parse_shipping(shipping.map(|i| cell(&record, i)).unwrap_or(""));
            tx.cart        = parse_cart(cart.map(|i| cell(&record, i)).unwrap_or(""));
            tx.raw_signals = signals.map(|i| cell(&record, i).to_string()).unwrap_or_default();
            out.push(tx);
        }
        Ok(out)
    }

    pub async fn read_file(&self, path: &Path) -> Result<Vec<Transaction>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading input table {}", path.display()))?;
        let rows = self
            .parse(&content)
            .with_context(|| format!("parsing input table {}", path.display()))?;
        info!(rows = rows.len(), path = %path.display(), "loaded transactions");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unixtime_integral_and_fractional() {
        assert_eq!(parse_unixtime("60").map(|t| t.timestamp()), Some(60));
        let t = parse_unixtime(" 1.5 ").unwrap();
        assert_eq!(t.timestamp(), 1);
        assert_eq!(t.timestamp_subsec_millis(), 500);
        assert!(parse_unixtime("yesterday").is_none());
        assert!(parse_unixtime("").is_none());
    }

    #[test]
    fn non_ascii_delimiter_rejected() {
        assert!(matches!(TableReader::new('§'), Err(IngestError::InvalidDelimiter('§'))));
        assert_eq!(TableReader::new(';').unwrap().delimiter(), ';');
    }

    #[test]
    fn builds_endpoint_and_pair_features() {
        let table = "SessionId;accountId;unixtime;device_type;ip;city;eventtriggeredsignals\n\
                     s0;a;10;mobile;1.2.3.4;;[\"login_failure\"]\n";
        let rows = TableReader::new(';').unwrap().parse(table).unwrap();
        assert_eq!(rows.len(), 1);
        let t = &rows[0];
        assert_eq!(t.index, 0);
        assert_eq!(t.session_id, "s0");
        assert_eq!(t.feature("device_type"), Some("mobile"));
        assert_eq!(t.feature("city"), None);
        assert!(t.endpoint.contains_key("city"));
        assert_eq!(t.feature("device_type::ip"), Some("mobile|||1.2.3.4"));
        assert_eq!(t.feature("device_type::city"), None);
        assert!(!t.endpoint.contains_key("useragent::deviceid"));
        assert_eq!(t.raw_signals, "[\"login_failure\"]");
        assert_eq!(t.shipping.street, " ");
    }

    #[test]
    fn payload_columns_are_parsed() {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(["sessionid", "accountid", "unixtime", "shipping_info", "cart_info"]).unwrap();
        wtr.write_record([
            "s0", "a", "5",
            r#"{"ShippingAddress": {"shippingcountry": "US"}}"#,
            r#"{"CartProduct": {"all": [{"productPrice": 10, "productQuantity": 3, "productType": "books"}]}}"#,
        ]).unwrap();
        let table = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

        let rows = TableReader::default().parse(&table).unwrap();
        assert_eq!(rows[0].shipping.country.as_deref(), Some("US"));
        assert_eq!(rows[0].cart.total_amount, 30.0);
        assert!(rows[0].endpoint.is_empty());
    }

    #[test]
    fn missing_column_is_fatal() {
        let err = TableReader::default().parse("sessionid,unixtime\ns0,1\n").unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn("accountid")));
    }

    #[test]
    fn bad_timestamp_is_fatal() {
        let err = TableReader::default()
            .parse("sessionid,accountid,unixtime\ns0,a,1\ns1,a,soon\n")
            .unwrap_err();
        match err {
            IngestError::InvalidTimestamp { row, value } => {
                assert_eq!(row, 1);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreadable_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        assert!(TableReader::default().read_file(&missing).await.is_err());
    }
}
