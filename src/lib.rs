//! Batch Gateway Runner Library
//! # Overview
//!
//! This library runs a list of opaque text records through a simulated,
//! bounded-concurrency gateway and keeps a live, ordered view of the results.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Record, ResultEntry, SessionStats, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::scheduler`] - Wave-by-wave admission and per-record tasks
//!   - [`core::result_store`] - Ordered results and derived statistics
//!   - [`core::session`] - Start, pause, resume, stop and reset of a run
//!   - [`core::simulator`] - Pseudo-random gateway outcomes
//! - [`io`] - Record parsing and CSV reports
//!
//! # Data Flow
//!
//! ```text
//! raw text ─► record_parser ─► BatchScheduler (wave by wave)
//!                                  │ OutcomeSimulator per record
//!                                  ▼
//!                              ResultStore ─► snapshots, stats, StoreEvents
//! ```
//!
//! # Entry Lifecycle
//!
//! Each admitted record becomes a `ResultEntry` that:
//! - starts as `Processing` with the gateway chosen at admission
//! - resolves exactly once to `Approved` or `Declined`
//! - may be charged once, and only when approved
//! - stays `Processing` forever if its run is stopped first

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod types;

pub use self::core::{BatchScheduler, ResultStore, RunReport, SessionController};
pub use self::io::{parse_records, write_results_csv};
pub use types::{
    Completion, EntryStatus, Record, ResultEntry, ResultFilter, RunnerError, SequenceId,
    SessionState, SessionStats,
};
