//! Batch Gateway Runner CLI
//!
//! Command-line interface for running a list of records through the simulated
//! gateway pipeline.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- records.txt > results.csv
//! cargo run -- --speed-ms 500 --concurrency 10 records.txt > results.csv
//! cargo run -- --seed 7 --filter approved --charge-approved records.txt
//! cat records.txt | cargo run -- - > results.csv
//! ```
//!
//! Records are read one per line, processed wave by wave, and the final
//! results are written to stdout as CSV. Progress is logged to stderr.
//! Ctrl-C stops the run in place; the results gathered so far are still
//! reported.
//!
//! # Exit Codes
//!
//! - 0: Success (including a run stopped with Ctrl-C)
//! - 1: Error (access denied, bad parameters, unreadable input, no records)

use batch_gateway_runner::cli::{self, CliArgs};
use batch_gateway_runner::core::{AccessGate, SessionConfig, SessionController, StoreEvent};
use batch_gateway_runner::io::{read_records, write_results_csv};
use batch_gateway_runner::types::{Record, ResultEntry, ResultFilter, RunnerError};
use std::process;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();
    init_tracing(args.log_level.as_deref());

    let mut output = std::io::stdout();
    if let Err(e) = run(&args).and_then(|entries| write_results_csv(&entries, &mut output)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr subscriber; `--log-level` wins over `RUST_LOG`
fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Check access, build the runtime and drive one session to its end
fn run(args: &CliArgs) -> Result<Vec<ResultEntry>, RunnerError> {
    AccessGate::from_env().verify(args.access_code.as_deref())?;
    let config = args.to_session_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.worker_threads())
        .enable_all()
        .build()
        .map_err(|e| RunnerError::IoError {
            message: format!("Failed to create tokio runtime: {}", e),
        })?;

    runtime.block_on(async {
        let records = load_records(args).await?;
        execute(records, config, args).await
    })
}

async fn load_records(args: &CliArgs) -> Result<Vec<Record>, RunnerError> {
    if args.reads_stdin() {
        return read_records(tokio::io::stdin()).await;
    }

    let file = tokio::fs::File::open(&args.input)
        .await
        .map_err(|e| RunnerError::IoError {
            message: format!("Failed to open file '{}': {}", args.input.display(), e),
        })?;
    read_records(file).await
}

async fn execute(
    records: Vec<Record>,
    config: SessionConfig,
    args: &CliArgs,
) -> Result<Vec<ResultEntry>, RunnerError> {
    let session = Arc::new(SessionController::with_seed(args.seed));
    let progress = tokio::spawn(log_progress(session.subscribe()));

    session.start(records, config.speed_ms(), config.concurrency_limit())?;

    let interrupt = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping run");
                if let Err(e) = session.stop() {
                    debug!("Nothing to stop: {}", e);
                }
            }
        })
    };

    let report = session.join().await;
    interrupt.abort();
    progress.abort();

    if let Some(report) = report {
        info!(
            state = %session.state(),
            waves = report.waves,
            completed = report.completed,
            abandoned = report.abandoned,
            "Run ended"
        );
    }

    if args.charge_approved {
        for entry in session.snapshot(ResultFilter::ApprovedOnly) {
            if !entry.charged {
                session.mark_charged(entry.sequence_id)?;
            }
        }
    }

    let (entries, stats) = session.view(args.filter);
    info!(%stats, reported = entries.len(), "Final statistics");
    Ok(entries)
}

/// Log every store change until the channel closes
async fn log_progress(mut events: broadcast::Receiver<StoreEvent>) {
    loop {
        match events.recv().await {
            Ok(StoreEvent::Completed { entry, stats }) => info!(
                sequence_id = entry.sequence_id,
                status = %entry.status,
                response = %entry.response,
                %stats,
                "Record resolved"
            ),
            Ok(event) => debug!(sequence_id = ?event.sequence_id(), "Store updated"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Progress log fell behind")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
