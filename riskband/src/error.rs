// riskband/src/error.rs
//
// Typed failures. Per-row data problems (bad JSON, null features, unknown
// signal tags) are absorbed where they occur and never reach these types.

use thiserror::Error;

use crate::records::ScorerKind;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("{scorer} scorer found no eligible feature for session {session_id} (account {account_id})")]
    NoEligibleFeatures {
        scorer:     ScorerKind,
        session_id: String,
        account_id: String,
    },

    #[error("no scorers enabled")]
    NoScorers,

    #[error("scorer weights sum to {0}, expected a positive total")]
    InvalidWeights(f64),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("row {row}: invalid unixtime `{value}`")]
    InvalidTimestamp { row: usize, value: String },

    #[error("delimiter `{0}` is not a single-byte character")]
    InvalidDelimiter(char),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
