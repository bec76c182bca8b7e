// riskband/src/lib.rs
//
// riskband — per-account transaction history fraud scoring.
//
// Each transaction is compared against its own account's earlier behaviour
// by three scorers (endpoint, shipping, purchase). Their scores are fused
// into one weighted 0–100 score and a 1–5 risk band, then corrected by the
// fraud list and behavioural signal tags.

pub mod engine;
pub mod error;
pub mod fraud_list;
pub mod ingest;
pub mod pipeline;
pub mod records;
pub mod scorers;
pub mod state;

pub use pipeline::{run, RunConfig, RunSummary};
