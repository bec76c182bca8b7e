// riskband/src/fraud_list.rs
//
// Known-fraud list: a comma-delimited file with `customer_email` and `ip`
// columns. Account ids are customer emails, so a listed email flags every
// transaction of that account.
//
// Listed IPs set the transaction's fraud discount to FRAUD_IP_DISCOUNT.
// At 1.0 an IP match is recorded but leaves the score untouched; lowering it
// makes matches penalise the fused score and tag it "Fraudulent IP".

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::error::IngestError;
use crate::records::Transaction;

pub const FRAUD_IP_DISCOUNT: f64 = 1.0;

const EMAIL_COLUMN: &str = "customer_email";
const IP_COLUMN:    &str = "ip";

#[derive(Debug, Clone, Default)]
pub struct FraudList {
    emails: HashSet<String>,
    ips:    HashSet<String>,
}

impl FraudList {
    pub fn parse(content: &str) -> Result<Self, IngestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = rdr.headers()?.clone();
        let position = |name: &'static str| {
            headers.iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(IngestError::MissingColumn(name))
        };
        let email_col = position(EMAIL_COLUMN)?;
        let ip_col    = position(IP_COLUMN)?;

        let mut list = Self::default();
        for record in rdr.records() {
            let record = record?;
            if let Some(email) = record.get(email_col).map(str::trim).filter(|v| !v.is_empty()) {
                list.emails.insert(email.to_string());
            }
            if let Some(ip) = record.get(ip_col).map(str::trim).filter(|v| !v.is_empty()) {
                list.ips.insert(ip.to_string());
            }
        }
        Ok(list)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading fraud list {}", path.display()))?;
        let list = Self::parse(&content)
            .with_context(|| format!("parsing fraud list {}", path.display()))?;
        if list.is_empty() {
            warn!(path = %path.display(), "fraud list is empty");
        }
        info!(emails = list.emails.len(), ips = list.ips.len(), "loaded fraud list");
        Ok(list)
    }

    pub fn is_listed_account(&self, account_id: &str) -> bool {
        self.emails.contains(account_id)
    }

    pub fn is_listed_ip(&self, ip: &str) -> bool {
        self.ips.contains(ip)
    }

    pub fn len(&self) -> usize { self.emails.len() + self.ips.len() }
    pub fn is_empty(&self) -> bool { self.emails.is_empty() && self.ips.is_empty() }

    /// Flag listed accounts and discount listed IPs. Returns the number of
    /// transactions that matched either set.
    pub fn mark(&self, transactions: &mut [Transaction]) -> usize {
        let mut matched = 0;
        for t in transactions.iter_mut() {
            let by_account = self.is_listed_account(&t.account_id);
            let by_ip      = t.feature("ip").is_some_and(|ip| self.is_listed_ip(ip));
            if by_account {
                t.fraud_list_entry = true;
            }
            if by_ip {
                t.fraud_discount = FRAUD_IP_DISCOUNT;
            }
            if by_account || by_ip {
                matched += 1;
            }
        }
        matched
    }
}
