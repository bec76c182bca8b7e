// riskband/src/engine/output.rs
//
// Writes the scored batch as a delimited table, one row per input
// transaction, in input order. The whole table is rendered in memory first
// and written in one go, so a failed run never leaves a partial file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::records::{ScoreRecord, ScorerKind};

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    sessionid:        &'a str,
    accountid:        &'a str,
    endpointscore:    Option<f64>,
    purchasescore:    Option<f64>,
    shippingscore:    Option<f64>,
    finalscore:       f64,
    finalband:        f64,
    fraudlistentry:   bool,
    signalstriggered: String,
}

impl<'a> From<&'a ScoreRecord> for OutputRow<'a> {
    fn from(r: &'a ScoreRecord) -> Self {
        Self {
            sessionid:        &r.session_id,
            accountid:        &r.account_id,
            endpointscore:    r.score(ScorerKind::Endpoint),
            purchasescore:    r.score(ScorerKind::Purchase),
            shippingscore:    r.score(ScorerKind::Shipping),
            finalscore:       r.final_score,
            finalband:        r.final_band,
            fraudlistentry:   r.fraud_list_entry,
            signalstriggered: r.signals_text(),
        }
    }
}

pub const COLUMNS: [&str; 9] = [
    "sessionid", "accountid", "endpointscore", "purchasescore", "shippingscore",
    "finalscore", "finalband", "fraudlistentry", "signalstriggered",
];

/// Render records (any order) as CSV bytes sorted by input position. The
/// header is always written, even for an empty batch.
pub fn render(records: &[ScoreRecord]) -> Result<Vec<u8>> {
    let mut ordered: Vec<&ScoreRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.index);

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(COLUMNS)?;
    for record in ordered {
        wtr.serialize(OutputRow::from(record))?;
    }
    wtr.into_inner().map_err(|e| e.into_error()).context("flushing output table")
}

pub struct OutputWriter {
    path: PathBuf,
}

impl OutputWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub async fn write(&self, records: &[ScoreRecord]) -> Result<()> {
        let bytes = render(records)?;
        tokio::fs::write(&self.path, &bytes)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        info!("Wrote {} rows to {}", records.len(), self.path.display());
        Ok(())
    }
}
