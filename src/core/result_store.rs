//! Thread-safe, ordered storage of per-record results
//!
//! This module provides the `ResultStore` struct, the single piece of mutable
//! state shared between the scheduler's tasks, the session controller and any
//! observer.
//!
//! # Design
//!
//! Entries live in a `Vec` behind one `parking_lot::RwLock`. Sequence ids are
//! dense and start at 1, so entry `n` sits at index `n - 1` and lookups need no
//! side index. Every mutation runs under the write lock and every read under
//! the read lock, which gives readers a consistent point-in-time view even
//! while completions are landing.
//!
//! Updates are applied to a copy of the entry and validated before being
//! committed, so a rejected mutation leaves nothing behind.
//!
//! # Observers
//!
//! ```text
//! scheduler ──on_admit/on_complete──► ResultStore ──broadcast──► StoreEvent receivers
//! session   ──mark_charged/clear────►
//! ```
//!
//! Events are sent while the write lock is held, so receivers see them in the
//! order the mutations were applied.

use crate::core::signals::RunSignals;
use crate::core::traits::{AdmissionSink, Delivery};
use crate::types::{
    Completion, EntryStatus, ResultEntry, ResultFilter, RunnerError, SequenceId, SessionStats,
};
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default capacity of the observer channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Change notification delivered to observers
///
/// Each event carries the entry as it stands after the mutation and the
/// statistics recomputed in the same critical section.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Admitted {
        entry: ResultEntry,
        stats: SessionStats,
    },
    Completed {
        entry: ResultEntry,
        stats: SessionStats,
    },
    Charged {
        entry: ResultEntry,
        stats: SessionStats,
    },
    /// Any other accepted update, such as a response text correction
    Updated {
        entry: ResultEntry,
        stats: SessionStats,
    },
    /// All entries were discarded by a session reset
    Cleared,
}

impl StoreEvent {
    /// Sequence id of the affected entry, if any
    pub fn sequence_id(&self) -> Option<SequenceId> {
        match self {
            StoreEvent::Admitted { entry, .. }
            | StoreEvent::Completed { entry, .. }
            | StoreEvent::Charged { entry, .. }
            | StoreEvent::Updated { entry, .. } => Some(entry.sequence_id),
            StoreEvent::Cleared => None,
        }
    }
}

/// Ordered, append-only result collection with derived statistics
#[derive(Debug)]
pub struct ResultStore {
    entries: RwLock<Vec<ResultEntry>>,
    events: broadcast::Sender<StoreEvent>,
}

impl ResultStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty store whose observer channel buffers `capacity` events
    ///
    /// Slow receivers that fall further behind observe a lag error and skip
    /// ahead; the store itself is never blocked by observers.
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            entries: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Append a newly admitted entry
    ///
    /// The entry must carry the next sequence id (`len + 1`) and be in the
    /// `Processing` state.
    pub fn append(&self, entry: ResultEntry) -> Result<(), RunnerError> {
        let mut entries = self.entries.write();
        self.push(&mut entries, entry)
    }

    /// Apply `mutator` to the entry with the given sequence id
    ///
    /// The mutator works on a copy. The copy replaces the stored entry only if
    /// it keeps the entry's identity and respects the monotonic status and
    /// charge rules.
    ///
    /// # Returns
    ///
    /// * `Ok(ResultEntry)` - The entry after the update
    /// * `Err(RunnerError::EntryNotFound)` - No such entry
    /// * `Err(...)` - The mutator's own error or a violated invariant
    pub fn update_by_sequence_id<F>(
        &self,
        sequence_id: SequenceId,
        mutator: F,
    ) -> Result<ResultEntry, RunnerError>
    where
        F: FnOnce(&mut ResultEntry) -> Result<(), RunnerError>,
    {
        let mut entries = self.entries.write();
        self.commit(&mut entries, sequence_id, mutator)
    }

    /// Record the final outcome of an in-flight entry
    pub fn complete(
        &self,
        sequence_id: SequenceId,
        completion: Completion,
    ) -> Result<ResultEntry, RunnerError> {
        self.update_by_sequence_id(sequence_id, |entry| finalize(entry, completion))
    }

    /// Mark an approved entry as charged
    ///
    /// # Returns
    ///
    /// * `Ok(ResultEntry)` - The entry, now charged
    /// * `Err(RunnerError::NotApproved)` - The entry is processing or declined
    /// * `Err(RunnerError::AlreadyCharged)` - The entry was charged before
    pub fn mark_charged(&self, sequence_id: SequenceId) -> Result<ResultEntry, RunnerError> {
        self.update_by_sequence_id(sequence_id, |entry| {
            if entry.status != EntryStatus::Approved {
                return Err(RunnerError::not_approved(sequence_id, entry.status));
            }
            if entry.charged {
                return Err(RunnerError::already_charged(sequence_id));
            }
            entry.charged = true;
            Ok(())
        })
    }

    /// Copy of every entry in admission order
    pub fn snapshot(&self) -> Vec<ResultEntry> {
        self.entries.read().clone()
    }

    /// Copy of the entries passing `filter`, in admission order
    pub fn filtered_snapshot(&self, filter: ResultFilter) -> Vec<ResultEntry> {
        self.entries
            .read()
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    /// Statistics tallied over the current entries
    pub fn recompute_stats(&self) -> SessionStats {
        SessionStats::tally(self.entries.read().iter())
    }

    /// Filtered entries and the statistics of the same instant
    pub fn view(&self, filter: ResultFilter) -> (Vec<ResultEntry>, SessionStats) {
        let entries = self.entries.read();
        let selected = entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        (selected, SessionStats::tally(entries.iter()))
    }

    /// Copy of a single entry
    pub fn get(&self, sequence_id: SequenceId) -> Option<ResultEntry> {
        let entries = self.entries.read();
        index_of(&entries, sequence_id).map(|index| entries[index].clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Discard every entry; the next admission starts again at id 1
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        self.notify(StoreEvent::Cleared);
    }

    /// Wait until no mutation is in progress
    ///
    /// Any writer that was inside its critical section has finished when this
    /// returns; writers that start afterwards observe whatever flags were set
    /// before the call.
    pub fn fence(&self) {
        drop(self.entries.write());
    }

    fn push(&self, entries: &mut Vec<ResultEntry>, entry: ResultEntry) -> Result<(), RunnerError> {
        let expected = entries.len() as SequenceId + 1;
        if entry.sequence_id != expected {
            return Err(RunnerError::sequence_gap(expected, entry.sequence_id));
        }
        if entry.status != EntryStatus::Processing || entry.charged {
            return Err(RunnerError::invalid_transition(
                entry.sequence_id,
                "entries must be appended as uncharged Processing entries",
            ));
        }

        entries.push(entry.clone());
        let stats = SessionStats::tally(entries.iter());
        self.notify(StoreEvent::Admitted { entry, stats });
        Ok(())
    }

    fn commit<F>(
        &self,
        entries: &mut [ResultEntry],
        sequence_id: SequenceId,
        mutator: F,
    ) -> Result<ResultEntry, RunnerError>
    where
        F: FnOnce(&mut ResultEntry) -> Result<(), RunnerError>,
    {
        let (updated, change) = apply_update(entries, sequence_id, mutator)?;
        let stats = SessionStats::tally(entries.iter());
        let entry = updated.clone();
        self.notify(match change {
            Change::Resolved => StoreEvent::Completed { entry, stats },
            Change::Charged => StoreEvent::Charged { entry, stats },
            Change::Other => StoreEvent::Updated { entry, stats },
        });
        Ok(updated)
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine; observers are optional.
        let _ = self.events.send(event);
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionSink for ResultStore {
    fn on_admit(&self, entry: ResultEntry, signals: &RunSignals) -> bool {
        let sequence_id = entry.sequence_id;
        let mut entries = self.entries.write();

        if signals.is_cancelled() {
            debug!(sequence_id, "Admission dropped after cancellation");
            return false;
        }

        match self.push(&mut entries, entry) {
            Ok(()) => true,
            Err(e) => {
                warn!(sequence_id, "Admission rejected: {}", e);
                false
            }
        }
    }

    fn on_complete(&self, sequence_id: SequenceId, completion: &Completion, signals: &RunSignals) -> Delivery {
        let mut entries = self.entries.write();

        // Checked under the write lock: once `fence` has run after a cancel
        // or a pause, no completion can slip in.
        if signals.is_cancelled() {
            debug!(sequence_id, "Completion dropped after cancellation");
            return Delivery::Dropped;
        }
        if signals.is_paused() {
            debug!(sequence_id, "Completion held while paused");
            return Delivery::Held;
        }

        match self.commit(&mut entries, sequence_id, |entry| finalize(entry, completion.clone())) {
            Ok(_) => Delivery::Recorded,
            Err(e) => {
                warn!(sequence_id, "Completion rejected: {}", e);
                Delivery::Dropped
            }
        }
    }
}

fn index_of(entries: &[ResultEntry], sequence_id: SequenceId) -> Option<usize> {
    let index = usize::try_from(sequence_id.checked_sub(1)?).ok()?;
    (index < entries.len()).then_some(index)
}

fn finalize(entry: &mut ResultEntry, completion: Completion) -> Result<(), RunnerError> {
    if entry.status.is_final() {
        return Err(RunnerError::invalid_transition(
            entry.sequence_id,
            "entry is already resolved",
        ));
    }
    if !completion.status.is_final() {
        return Err(RunnerError::invalid_transition(
            entry.sequence_id,
            "completion must resolve to approved or declined",
        ));
    }
    entry.status = completion.status;
    entry.response = completion.response;
    entry.completed_at = Some(Utc::now());
    Ok(())
}

/// What an accepted update changed
enum Change {
    Resolved,
    Charged,
    Other,
}

fn apply_update<F>(
    entries: &mut [ResultEntry],
    sequence_id: SequenceId,
    mutator: F,
) -> Result<(ResultEntry, Change), RunnerError>
where
    F: FnOnce(&mut ResultEntry) -> Result<(), RunnerError>,
{
    let index = index_of(entries, sequence_id).ok_or_else(|| RunnerError::entry_not_found(sequence_id))?;

    let mut candidate = entries[index].clone();
    mutator(&mut candidate)?;
    check_transition(&entries[index], &candidate)?;

    let change = if !entries[index].status.is_final() && candidate.status.is_final() {
        Change::Resolved
    } else if !entries[index].charged && candidate.charged {
        Change::Charged
    } else {
        Change::Other
    };

    entries[index] = candidate.clone();
    Ok((candidate, change))
}

fn check_transition(before: &ResultEntry, after: &ResultEntry) -> Result<(), RunnerError> {
    let fail = |reason: &str| Err(RunnerError::invalid_transition(before.sequence_id, reason));

    if after.sequence_id != before.sequence_id
        || after.record != before.record
        || after.admitted_at != before.admitted_at
    {
        return fail("identity fields are immutable");
    }
    if after.gateway != before.gateway {
        return fail("gateway is fixed at admission");
    }
    if before.status.is_final() && after.status != before.status {
        return fail("status cannot change once resolved");
    }
    if after.status.is_final() && after.completed_at.is_none() {
        return fail("resolved entries need a completion time");
    }
    if before.completed_at.is_some() && after.completed_at != before.completed_at {
        return fail("completion time is set once");
    }
    if before.charged && !after.charged {
        return fail("charge cannot be undone");
    }
    if after.charged && after.status != EntryStatus::Approved {
        return fail("only approved entries can be charged");
    }
    Ok(())
}
