//! replicheck — reconcile two ArangoDB instances and report drift.
//!
//! Usage:
//!   replicheck --url1 http://a:8529 --url2 http://b:8529 --db1 prod
//!
//! Credentials come from REPLICHECK_USERNAME1/REPLICHECK_PASSWORD1 and
//! REPLICHECK_USERNAME2/REPLICHECK_PASSWORD2 (source 2 falls back to
//! source 1's credentials).
//!
//! Exits 0 on any completed run, discrepancies included; non-zero only on
//! a fatal setup failure (bad arguments, unreachable source).

use anyhow::{Context, Result};
use clap::Parser;
use replicheck_engine::{Reconciler, RetryPolicy, RunConfig};
use replicheck_report::{render, MarkdownDirSink};
use replicheck_source::{ArangoConfig, ArangoSource, EntitySource};
use replicheck_types::ExclusionPath;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "replicheck")]
#[command(about = "Compare two ArangoDB instances and report discrepancies")]
struct Args {
    /// First source URL
    #[arg(long)]
    url1: String,

    /// Second source URL
    #[arg(long)]
    url2: String,

    /// Database name on the first source
    #[arg(long)]
    db1: String,

    /// Database name on the second source (defaults to --db1)
    #[arg(long)]
    db2: Option<String>,

    /// Output directory for the markdown report
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Recency-sample size per collection
    #[arg(long, default_value = "10")]
    sample_size: usize,

    /// Uniform-random sample size per collection
    #[arg(long, default_value = "5")]
    random_sample_size: usize,

    /// Seed for the random sampler (reproducible runs)
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Concurrent per-collection comparisons
    #[arg(long, default_value = "8")]
    concurrency: usize,

    /// Fetch attempts per item before skipping it
    #[arg(long, default_value = "3")]
    max_attempts: u32,

    /// Backoff base in seconds (doubles per attempt)
    #[arg(long, default_value = "2")]
    backoff_secs: u64,

    /// Field paths to ignore in detail comparison (repeatable)
    #[arg(long = "ignore", default_values = ["_rev", "_id"])]
    ignore: Vec<String>,

    /// Compare arrays positionally instead of as multisets
    #[arg(long)]
    ordered_arrays: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn env_or(name: &str, fallback: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| fallback.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let username1 = env_or("REPLICHECK_USERNAME1", "root");
    let password1 = env_or("REPLICHECK_PASSWORD1", "");
    let username2 = env_or("REPLICHECK_USERNAME2", &username1);
    let password2 = env_or("REPLICHECK_PASSWORD2", &password1);

    let db2 = args.db2.clone().unwrap_or_else(|| args.db1.clone());
    let source_a = ArangoSource::new(ArangoConfig {
        base_url: args.url1.clone(),
        database: args.db1.clone(),
        username: username1,
        password: password1,
        label: "db1".to_string(),
        timeout_secs: args.timeout_secs,
    })
    .context("failed to build client for source 1")?;
    let source_b = ArangoSource::new(ArangoConfig {
        base_url: args.url2.clone(),
        database: db2,
        username: username2,
        password: password2,
        label: "db2".to_string(),
        timeout_secs: args.timeout_secs,
    })
    .context("failed to build client for source 2")?;

    let config = RunConfig {
        recent_sample_size: args.sample_size,
        random_sample_size: args.random_sample_size,
        random_seed: args.seed,
        concurrency: args.concurrency,
        retry: RetryPolicy {
            max_attempts: args.max_attempts,
            base_delay: Duration::from_secs(args.backoff_secs),
        },
        exclusions: args.ignore.iter().map(|p| ExclusionPath::new(p)).collect(),
        order_insensitive_sequences: !args.ordered_arrays,
    };

    // Operator interrupt flips the run-scoped cancellation signal.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finalizing with partial results");
            let _ = cancel_tx.send(true);
        }
    });

    info!(url1 = %args.url1, url2 = %args.url2, db = %args.db1, "starting reconciliation");
    let source_a: Arc<dyn EntitySource> = Arc::new(source_a);
    let source_b: Arc<dyn EntitySource> = Arc::new(source_b);
    let report = Reconciler::new(source_a, source_b, config)
        .with_cancellation(cancel_rx)
        .run()
        .await
        .context("reconciliation failed to start")?;

    let mut sink = MarkdownDirSink::create(&args.out, &args.db1)
        .context("failed to create report directory")?;
    render(&report, &mut sink).context("failed to write report")?;

    let summary = report.summary();
    println!("Report written to {}", sink.dir().display());
    println!(
        "existence mismatches: {}, count mismatches: {}, entity diffs: {}, document diffs: {}, skips: {}",
        summary.existence_mismatches,
        summary.count_mismatches,
        summary.entities_with_differences,
        summary.documents_with_differences,
        summary.skips
    );
    if summary.incomplete {
        println!("run incomplete: cancelled before all phases finished");
    }
    Ok(())
}
