//! Record and result-entry types for the batch gateway runner
//!
//! This module defines the opaque input record, the per-record result entry
//! tracked by the result store, and the completion payload the scheduler
//! hands over when a record's simulated outcome is finalized.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Sequence identifier
///
/// 1-based position assigned at admission time. Dense and unique within a session.
pub type SequenceId = u64;

/// Response text shown while a record is still in flight
pub const PROCESSING_RESPONSE: &str = "Processing...";

/// A single opaque input line
///
/// The payload is never inspected for structure. Cloning is cheap because the
/// text is shared, which lets every in-flight task hold its own handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record(Arc<str>);

impl Record {
    /// Create a record from any string-like payload
    pub fn new(payload: impl Into<Arc<str>>) -> Self {
        Record(payload.into())
    }

    /// Borrow the payload
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Record {
    fn from(value: &str) -> Self {
        Record::new(value)
    }
}

/// Lifecycle status of a result entry
///
/// Moves only `Processing -> Approved` or `Processing -> Declined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// Admitted and waiting for its simulated outcome
    Processing,
    /// Resolved with an approval confirmation
    Approved,
    /// Resolved with a decline reason code
    Declined,
}

impl EntryStatus {
    /// Whether this status is a resolved one
    pub fn is_final(self) -> bool {
        !matches!(self, EntryStatus::Processing)
    }

    /// Upper-case label used in logs and reports
    pub fn label(self) -> &'static str {
        match self {
            EntryStatus::Processing => "PROCESSING",
            EntryStatus::Approved => "APPROVED",
            EntryStatus::Declined => "DECLINED",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final outcome handed to the store when a record completes
///
/// The status is always `Approved` or `Declined`; the gateway label is not
/// part of the completion because it is fixed at admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Resolved status
    pub status: EntryStatus,

    /// Final response code replacing [`PROCESSING_RESPONSE`]
    pub response: String,
}

/// Per-record result tracked by the result store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    /// Identity key, stable for the lifetime of the entry
    pub sequence_id: SequenceId,

    /// The originating payload
    pub record: Record,

    /// Simulated gateway chosen at admission
    pub gateway: String,

    /// `"Processing..."` while in flight, the final response code afterwards
    pub response: String,

    /// Current lifecycle status
    pub status: EntryStatus,

    /// When the record entered `Processing`
    pub admitted_at: DateTime<Utc>,

    /// Set once, on the transition out of `Processing`
    pub completed_at: Option<DateTime<Utc>>,

    /// Whether an approved entry has been charged
    ///
    /// Only ever flips false to true, and only while `status == Approved`.
    pub charged: bool,
}

impl ResultEntry {
    /// Create a freshly admitted entry in the `Processing` state
    pub fn admitted(sequence_id: SequenceId, record: Record, gateway: impl Into<String>) -> Self {
        ResultEntry {
            sequence_id,
            record,
            gateway: gateway.into(),
            response: PROCESSING_RESPONSE.to_string(),
            status: EntryStatus::Processing,
            admitted_at: Utc::now(),
            completed_at: None,
            charged: false,
        }
    }

    /// Whether the entry has left `Processing`
    pub fn is_resolved(&self) -> bool {
        self.status.is_final()
    }
}
