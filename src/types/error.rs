//! Error types for the batch gateway runner
//!
//! This module defines all error types that can be surfaced to the caller of a
//! session operation. Errors are designed to be descriptive and user-friendly
//! for CLI output.
//!
//! # Error Categories
//!
//! - **Validation Errors**: no records left after parsing
//! - **Configuration Errors**: speed or concurrency outside the supported range
//! - **State Errors**: operations issued in the wrong session state, charge
//!   requests against entries that cannot be charged
//! - **I/O Errors**: input file unreadable, report unwritable
//!
//! Cancellation is not an error. Abandoned tasks are dropped silently and the
//! designed-in declined outcome is a normal result.

use super::record::{EntryStatus, SequenceId};
use super::session::SessionState;
use thiserror::Error;

/// Main error type for the batch gateway runner
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunnerError {
    /// The input contained no non-empty lines
    ///
    /// No run is started.
    #[error("No records supplied")]
    NoRecords,

    /// Concurrency limit outside the supported range
    #[error("Invalid concurrency limit {value}: expected {min}..={max}")]
    InvalidConcurrency {
        /// The rejected value
        value: usize,
        /// Smallest accepted value
        min: usize,
        /// Largest accepted value
        max: usize,
    },

    /// Base delay outside the supported range
    #[error("Invalid speed {value}ms: expected {min}..={max}ms")]
    InvalidSpeed {
        /// The rejected value in milliseconds
        value: u64,
        /// Smallest accepted value
        min: u64,
        /// Largest accepted value
        max: u64,
    },

    /// `start` issued while a run is in progress
    #[error("A run is already active ({state})")]
    AlreadyRunning {
        /// State the session was in
        state: SessionState,
    },

    /// `start` issued on a finished session that has not been reset
    #[error("Session is {state}; reset it before starting a new run")]
    ResetRequired {
        /// State the session was in
        state: SessionState,
    },

    /// Pause, resume or stop issued without an active run
    #[error("No active run to {operation} (session is {state})")]
    NotRunning {
        /// Operation that was rejected
        operation: String,
        /// State the session was in
        state: SessionState,
    },

    /// `pause` issued while already paused
    #[error("Run is already paused")]
    AlreadyPaused,

    /// `resume` issued while not paused
    #[error("Run is not paused")]
    NotPaused,

    /// `reset` issued while a run is in progress
    #[error("Cannot reset while the run is {state}")]
    ResetWhileActive {
        /// State the session was in
        state: SessionState,
    },

    /// No entry with the given sequence id
    #[error("No entry with sequence id {sequence_id}")]
    EntryNotFound {
        /// Requested sequence id
        sequence_id: SequenceId,
    },

    /// Charge requested for an entry that is not approved
    #[error("Entry {sequence_id} is {status}, only approved entries can be charged")]
    NotApproved {
        /// Requested sequence id
        sequence_id: SequenceId,
        /// The entry's current status
        status: EntryStatus,
    },

    /// Charge requested twice for the same entry
    #[error("Entry {sequence_id} is already charged")]
    AlreadyCharged {
        /// Requested sequence id
        sequence_id: SequenceId,
    },

    /// An appended entry broke the dense 1..N numbering
    #[error("Sequence id {actual} appended where {expected} was expected")]
    SequenceGap {
        /// The next id the store expected
        expected: SequenceId,
        /// The id that was offered
        actual: SequenceId,
    },

    /// A mutation would have broken an entry invariant
    ///
    /// The entry is left untouched.
    #[error("Invalid update of entry {sequence_id}: {reason}")]
    InvalidTransition {
        /// Entry the update targeted
        sequence_id: SequenceId,
        /// Which invariant the update violated
        reason: String,
    },

    /// The access code did not match the configured secret
    #[error("Access denied: invalid access code")]
    AccessDenied,

    /// I/O error occurred while reading input or writing output
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// The results report could not be written
    #[error("Report error: {message}")]
    ReportError {
        /// Description of the failure
        message: String,
    },
}

impl From<std::io::Error> for RunnerError {
    fn from(error: std::io::Error) -> Self {
        RunnerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for RunnerError {
    fn from(error: csv::Error) -> Self {
        RunnerError::ReportError {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl RunnerError {
    /// Create an InvalidConcurrency error
    pub fn invalid_concurrency(value: usize, min: usize, max: usize) -> Self {
        RunnerError::InvalidConcurrency { value, min, max }
    }

    /// Create an InvalidSpeed error
    pub fn invalid_speed(value: u64, min: u64, max: u64) -> Self {
        RunnerError::InvalidSpeed { value, min, max }
    }

    /// Create a NotRunning error
    pub fn not_running(operation: &str, state: SessionState) -> Self {
        RunnerError::NotRunning {
            operation: operation.to_string(),
            state,
        }
    }

    /// Create an EntryNotFound error
    pub fn entry_not_found(sequence_id: SequenceId) -> Self {
        RunnerError::EntryNotFound { sequence_id }
    }

    /// Create a NotApproved error
    pub fn not_approved(sequence_id: SequenceId, status: EntryStatus) -> Self {
        RunnerError::NotApproved {
            sequence_id,
            status,
        }
    }

    /// Create an AlreadyCharged error
    pub fn already_charged(sequence_id: SequenceId) -> Self {
        RunnerError::AlreadyCharged { sequence_id }
    }

    /// Create an InvalidTransition error
    pub fn invalid_transition(sequence_id: SequenceId, reason: &str) -> Self {
        RunnerError::InvalidTransition {
            sequence_id,
            reason: reason.to_string(),
        }
    }

    /// Create a SequenceGap error
    pub fn sequence_gap(expected: SequenceId, actual: SequenceId) -> Self {
        RunnerError::SequenceGap { expected, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::no_records(RunnerError::NoRecords, "No records supplied")]
    #[case::invalid_concurrency(
        RunnerError::InvalidConcurrency { value: 0, min: 1, max: 20 },
        "Invalid concurrency limit 0: expected 1..=20"
    )]
    #[case::invalid_speed(
        RunnerError::InvalidSpeed { value: 100, min: 500, max: 5000 },
        "Invalid speed 100ms: expected 500..=5000ms"
    )]
    #[case::already_running(
        RunnerError::AlreadyRunning { state: SessionState::Paused },
        "A run is already active (paused)"
    )]
    #[case::reset_required(
        RunnerError::ResetRequired { state: SessionState::Completed },
        "Session is completed; reset it before starting a new run"
    )]
    #[case::not_running(
        RunnerError::NotRunning { operation: "pause".to_string(), state: SessionState::AwaitingInput },
        "No active run to pause (session is awaiting-input)"
    )]
    #[case::reset_while_active(
        RunnerError::ResetWhileActive { state: SessionState::Running },
        "Cannot reset while the run is running"
    )]
    #[case::not_approved(
        RunnerError::NotApproved { sequence_id: 3, status: EntryStatus::Declined },
        "Entry 3 is DECLINED, only approved entries can be charged"
    )]
    #[case::already_charged(
        RunnerError::AlreadyCharged { sequence_id: 9 },
        "Entry 9 is already charged"
    )]
    #[case::sequence_gap(
        RunnerError::SequenceGap { expected: 2, actual: 4 },
        "Sequence id 4 appended where 2 was expected"
    )]
    #[case::invalid_transition(
        RunnerError::InvalidTransition { sequence_id: 5, reason: "status cannot move backwards".to_string() },
        "Invalid update of entry 5: status cannot move backwards"
    )]
    #[case::io_error(
        RunnerError::IoError { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    fn test_error_display(#[case] error: RunnerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::invalid_concurrency(
        RunnerError::invalid_concurrency(21, 1, 20),
        RunnerError::InvalidConcurrency { value: 21, min: 1, max: 20 }
    )]
    #[case::not_running(
        RunnerError::not_running("stop", SessionState::Completed),
        RunnerError::NotRunning { operation: "stop".to_string(), state: SessionState::Completed }
    )]
    #[case::entry_not_found(
        RunnerError::entry_not_found(42),
        RunnerError::EntryNotFound { sequence_id: 42 }
    )]
    #[case::not_approved(
        RunnerError::not_approved(1, EntryStatus::Processing),
        RunnerError::NotApproved { sequence_id: 1, status: EntryStatus::Processing }
    )]
    fn test_helper_functions(#[case] result: RunnerError, #[case] expected: RunnerError) {
        assert_eq!(result, expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: RunnerError = io_error.into();
        assert!(matches!(error, RunnerError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
