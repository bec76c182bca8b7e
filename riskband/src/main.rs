// riskband/src/main.rs
//
// riskband — batch fraud-risk scoring of e-commerce transactions
//
// Reads a delimited transaction table, scores every row against its
// account's own history, and writes one output row per input row.
//
// Usage:
//   riskband --data data/transactions.csv
//   riskband --data tx.tsv --csv-delimiter '\t' --output scores.csv
//   riskband --data tx.csv --purchase-model 0      # endpoint + shipping only

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use riskband::{RunConfig, RunSummary};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "riskband",
    about   = "Per-account transaction history fraud scoring",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, help = "Delimited transaction table")]
    data: PathBuf,

    #[arg(long, default_value = "data/fraud_list.csv",
          help = "Fraud list with customer_email and ip columns")]
    fraud_list: PathBuf,

    #[arg(long, default_value = "output.csv", help = "Output table")]
    output: PathBuf,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1),
          help = "Enable the endpoint scorer (1/0)")]
    endpoint_model: u8,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1),
          help = "Enable the shipping scorer (1/0)")]
    shipping_model: u8,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1),
          help = "Enable the purchase scorer (1/0)")]
    purchase_model: u8,

    #[arg(long, default_value_t = ',', value_parser = parse_delimiter,
          help = "Input table delimiter")]
    csv_delimiter: char,
}

/// Accepts a single character or the escapes `\t` / `tab`.
fn parse_delimiter(raw: &str) -> Result<char, String> {
    match raw {
        "\\t" | "tab" => Ok('\t'),
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c),
                _ => Err(format!("expected a single ASCII character, got `{}`", raw)),
            }
        }
    }
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        Self {
            data:       cli.data,
            fraud_list: cli.fraud_list,
            output:     cli.output,
            endpoint:   cli.endpoint_model == 1,
            shipping:   cli.shipping_model == 1,
            purchase:   cli.purchase_model == 1,
            delimiter:  cli.csv_delimiter,
        }
    }
}

// ── Terminal output ───────────────────────────────────────────────────────────

fn print_header(config: &RunConfig) {
    let flag = |on: bool| if on { "\x1b[92mon\x1b[0m" } else { "\x1b[90moff\x1b[0m" };
    println!("\n\x1b[1m  riskband\x1b[0m  \x1b[90mv{}\x1b[0m", env!("CARGO_PKG_VERSION"));
    println!("  Data      : {}", config.data.display());
    println!("  Fraud list: {}", config.fraud_list.display());
    println!("  Scorers   : endpoint={}  shipping={}  purchase={}",
             flag(config.endpoint), flag(config.shipping), flag(config.purchase));
}

fn print_summary(summary: &RunSummary, output: &std::path::Path, elapsed: f64) {
    println!(
        "\n\x1b[1m── done  rows={}  accounts={}  flagged={}  signalled={}  mean={:.2}  {:.2}s ──\x1b[0m",
        summary.rows, summary.accounts, summary.flagged, summary.signalled,
        summary.mean_final_score, elapsed,
    );
    println!("  Output: \x1b[90m{}\x1b[0m\n", output.display());
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("riskband=info".parse()?))
        .compact().init();

    let config = RunConfig::from(Cli::parse());
    let start  = Instant::now();
    print_header(&config);

    let summary = riskband::run(&config).await?;
    print_summary(&summary, &config.output, start.elapsed().as_secs_f64());
    Ok(())
}
