//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `record`: input records, result entries and completions
//! - `session`: aggregate statistics, session lifecycle and read filters
//! - `error`: Error types for the batch gateway runner

pub mod error;
pub mod record;
pub mod session;

pub use error::RunnerError;
pub use record::{Completion, EntryStatus, Record, ResultEntry, SequenceId, PROCESSING_RESPONSE};
pub use session::{ResultFilter, SessionState, SessionStats};
