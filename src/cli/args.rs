use crate::core::config::{SessionConfig, DEFAULT_CONCURRENCY, DEFAULT_SPEED_MS};
use crate::types::{ResultFilter, RunnerError};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Input path that selects standard input
pub const STDIN_INPUT: &str = "-";

/// Run a list of records through the simulated gateway pipeline
#[derive(Parser, Debug)]
#[command(name = "batch-gateway-runner")]
#[command(about = "Run records through a simulated bounded-concurrency gateway", long_about = None)]
pub struct CliArgs {
    /// Input file with one record per line
    #[arg(value_name = "INPUT", help = "Path to the record file, or '-' for stdin")]
    pub input: PathBuf,

    /// Base delay per record in milliseconds
    #[arg(
        long = "speed-ms",
        value_name = "MS",
        default_value_t = DEFAULT_SPEED_MS,
        env = "BATCH_RUNNER_SPEED_MS",
        help = "Base delay per record in milliseconds (range: 500-5000)"
    )]
    pub speed_ms: u64,

    /// Records admitted per wave
    #[arg(
        long = "concurrency",
        value_name = "COUNT",
        default_value_t = DEFAULT_CONCURRENCY,
        env = "BATCH_RUNNER_CONCURRENCY",
        help = "Records processed concurrently per wave (range: 1-20)"
    )]
    pub concurrency: usize,

    /// Seed for reproducible outcomes
    #[arg(long = "seed", value_name = "SEED", help = "Seed for reproducible outcomes")]
    pub seed: Option<u64>,

    /// Which results to write to the report
    #[arg(
        long = "filter",
        value_name = "FILTER",
        value_enum,
        default_value_t = ResultFilter::All,
        help = "Results to report: 'all', 'approved' or 'declined'"
    )]
    pub filter: ResultFilter,

    /// Charge every approved entry once the run ends
    #[arg(long = "charge-approved", help = "Mark every approved entry as charged after the run")]
    pub charge_approved: bool,

    /// Access code checked against BATCH_RUNNER_SECRET
    #[arg(
        long = "access-code",
        value_name = "CODE",
        env = "BATCH_RUNNER_ACCESS_CODE",
        hide_env_values = true,
        help = "Access code, required when BATCH_RUNNER_SECRET is set"
    )]
    pub access_code: Option<String>,

    /// Tokio worker threads
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Number of runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Log filter directive
    #[arg(
        long = "log-level",
        value_name = "DIRECTIVE",
        help = "Log filter, e.g. 'debug' or 'batch_gateway_runner=trace' (default: RUST_LOG or info)"
    )]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Validate the run parameters
    ///
    /// # Returns
    ///
    /// * `Ok(SessionConfig)` - Speed and concurrency are in range
    /// * `Err(RunnerError)` - One of them is out of range
    pub fn to_session_config(&self) -> Result<SessionConfig, RunnerError> {
        SessionConfig::new(self.speed_ms, self.concurrency)
    }

    /// Worker threads for the runtime, never zero
    pub fn worker_threads(&self) -> usize {
        match self.worker_threads {
            Some(0) | None => num_cpus::get(),
            Some(count) => count,
        }
    }

    /// Whether records are read from standard input
    pub fn reads_stdin(&self) -> bool {
        self.input == Path::new(STDIN_INPUT)
    }
}
