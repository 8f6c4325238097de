//! Core traits at the seam between the scheduler and result storage
//!
//! The scheduler only knows how to announce admissions and completions; where
//! they land is decided by the implementor. The session controller wires the
//! scheduler to a [`ResultStore`](crate::core::ResultStore), tests wire it to
//! recording sinks.

use crate::core::signals::RunSignals;
use crate::types::{Completion, ResultEntry, SequenceId};

/// Receiver of scheduler events
///
/// Implementations are shared across every in-flight task and must serialize
/// their own mutations.
pub trait AdmissionSink: Send + Sync {
    /// A record was admitted and is now visible as `Processing`
    ///
    /// Like completions, admissions are dropped once `signals` report
    /// cancellation.
    ///
    /// # Returns
    ///
    /// `true` if the entry was recorded, `false` if it was dropped.
    fn on_admit(&self, entry: ResultEntry, signals: &RunSignals) -> bool;

    /// A record's outcome is final
    ///
    /// Implementations must re-check `signals` atomically with the write: the
    /// completion is dropped when cancellation won the race and handed back
    /// when the run was paused in the meantime.
    fn on_complete(&self, sequence_id: SequenceId, completion: &Completion, signals: &RunSignals) -> Delivery;
}

/// What became of a completion offered to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written; the entry is resolved
    Recorded,
    /// Not written because the run is paused; offer it again after resume
    Held,
    /// Not written and never will be
    Dropped,
}
