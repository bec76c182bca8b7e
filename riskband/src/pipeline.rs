// riskband/src/pipeline.rs
//
// One batch run, start to finish:
//
//   fraud list → input table → fraud marking → fit + score + fuse
//              → signal deduction → output table
//
// Every input is read before scoring starts and the output is written only
// after every stage has succeeded, so a failed run leaves no output file.
// Scoring is CPU-bound and runs on the blocking pool.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::engine::fusion::{default_weight, ModelMerger};
use crate::engine::output::OutputWriter;
use crate::engine::signals::SignalAdjuster;
use crate::error::ScoreError;
use crate::fraud_list::FraudList;
use crate::ingest::TableReader;
use crate::records::{ScoreRecord, ScorerKind, Transaction};
use crate::scorers::endpoint::EndpointScorer;
use crate::scorers::purchase::PurchaseScorer;
use crate::scorers::shipping::ShippingScorer;
use crate::state::window::AccountTimeline;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data:       PathBuf,
    pub fraud_list: PathBuf,
    pub output:     PathBuf,
    pub endpoint:   bool,
    pub shipping:   bool,
    pub purchase:   bool,
    pub delimiter:  char,
}

impl RunConfig {
    /// All scorers on, comma-delimited, default fraud list and output paths.
    pub fn new(data: impl Into<PathBuf>) -> Self {
        Self {
            data:       data.into(),
            fraud_list: PathBuf::from("data/fraud_list.csv"),
            output:     PathBuf::from("output.csv"),
            endpoint:   true,
            shipping:   true,
            purchase:   true,
            delimiter:  ',',
        }
    }

    pub fn enabled(&self) -> Vec<ScorerKind> {
        [
            (ScorerKind::Endpoint, self.endpoint),
            (ScorerKind::Shipping, self.shipping),
            (ScorerKind::Purchase, self.purchase),
        ]
        .into_iter()
        .filter_map(|(kind, on)| on.then_some(kind))
        .collect()
    }

    pub fn merger(&self) -> Result<ModelMerger> {
        let enabled = self.enabled();
        if enabled.is_empty() {
            bail!("all scorers are disabled; enable at least one of endpoint, shipping, purchase");
        }
        let mut merger = ModelMerger::new();
        for kind in enabled {
            let weight = default_weight(kind);
            merger = match kind {
                ScorerKind::Endpoint => merger.with(EndpointScorer::new(), weight),
                ScorerKind::Shipping => merger.with(ShippingScorer, weight),
                ScorerKind::Purchase => merger.with(PurchaseScorer::new(), weight),
            };
        }
        Ok(merger)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub rows:             usize,
    pub accounts:         usize,
    /// Transactions matched by the fraud list.
    pub flagged:          usize,
    /// Records carrying at least one triggered signal.
    pub signalled:        usize,
    pub mean_final_score: f64,
}

impl RunSummary {
    fn from_records(records: &[ScoreRecord], accounts: usize, flagged: usize) -> Self {
        let rows = records.len();
        let mean_final_score = if rows == 0 {
            0.0
        } else {
            records.iter().map(|r| r.final_score).sum::<f64>() / rows as f64
        };
        Self {
            rows,
            accounts,
            flagged,
            signalled: records.iter().filter(|r| !r.signals_triggered.is_empty()).count(),
            mean_final_score,
        }
    }
}

/// Fuse and adjust one marked batch. Records come back in input order.
pub fn score_batch(merger: &ModelMerger, transactions: &[Transaction]) -> Result<Vec<ScoreRecord>, ScoreError> {
    let mut records = merger.run(transactions)?;
    SignalAdjuster.adjust_all(&mut records, transactions);
    Ok(records)
}

pub async fn run(config: &RunConfig) -> Result<RunSummary> {
    let merger = config.merger()?;
    let reader = TableReader::new(config.delimiter)?;
    info!(scorers = ?merger.kinds(), data = %config.data.display(), "starting run");

    let fraud_list       = FraudList::load(&config.fraud_list).await?;
    let mut transactions = reader.read_file(&config.data).await?;
    let flagged          = fraud_list.mark(&mut transactions);
    let accounts         = AccountTimeline::new(&transactions).n_accounts();
    info!(flagged, accounts, "marked transactions against fraud list");

    let records = tokio::task::spawn_blocking(move || score_batch(&merger, &transactions))
        .await
        .context("scoring task panicked")??;

    OutputWriter::new(&config.output).write(&records).await?;

    let summary = RunSummary::from_records(&records, accounts, flagged);
    info!(
        rows = summary.rows,
        signalled = summary.signalled,
        mean = summary.mean_final_score,
        "run complete"
    );
    Ok(summary)
}
