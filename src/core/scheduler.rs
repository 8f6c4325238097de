//! Wave-by-wave execution of a record list
//!
//! This module provides the `BatchScheduler` struct, which admits records in
//! bounded waves and runs one tokio task per admitted record.
//!
//! # Design
//!
//! Records are partitioned by position into waves of at most
//! `concurrency_limit` records. For each wave the scheduler:
//!
//! 1. Checks cancellation; a cancelled run admits nothing further
//! 2. Assigns the next sequence ids and draws every outcome
//! 3. Announces all admissions to the sink before any task starts
//! 4. Spawns one task per record and waits for all of them
//!
//! The wait in step 4 is the barrier between waves, so the number of tasks in
//! flight never exceeds the concurrency limit.
//!
//! # Architecture
//!
//! ```text
//! BatchScheduler
//!     ├── Arc<OutcomeSimulator>   (shared outcome source)
//!     ├── concurrency_limit       (wave size)
//!     └── Arc<AtomicUsize>        (in-flight gauge)
//!
//! per record task: sleep(delay) ─► wait_while_paused ─► sink.on_complete
//!                       └──────── cancel ──────┴──► abandoned
//! ```

use crate::core::signals::RunSignals;
use crate::core::simulator::{Outcome, OutcomeSimulator};
use crate::core::traits::{AdmissionSink, Delivery};
use crate::types::{Completion, Record, ResultEntry, SequenceId};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Summary of one scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Records handed to the run
    pub records: usize,

    /// Waves that were admitted
    pub waves: usize,

    /// Records that received a sequence id
    pub admitted: usize,

    /// Admitted records whose outcome was recorded
    pub completed: usize,

    /// Admitted records dropped because the run was cancelled
    pub abandoned: usize,

    /// Whether cancellation cut the run short
    pub cancelled: bool,
}

impl RunReport {
    /// Whether every record was admitted and completed
    pub fn is_complete(&self) -> bool {
        self.completed == self.records
    }
}

/// Bounded-wave scheduler
///
/// Cloning is cheap; clones share the simulator and the in-flight gauge.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    simulator: Arc<OutcomeSimulator>,
    concurrency_limit: usize,
    in_flight: Arc<AtomicUsize>,
}

impl BatchScheduler {
    /// Create a new BatchScheduler
    ///
    /// # Arguments
    ///
    /// * `simulator` - Outcome source shared by every task
    /// * `concurrency_limit` - Maximum wave size; validated by `SessionConfig`
    ///   before a run, clamped to at least 1 here
    pub fn new(simulator: Arc<OutcomeSimulator>, concurrency_limit: usize) -> Self {
        Self {
            simulator,
            concurrency_limit: concurrency_limit.max(1),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Number of record tasks currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Split `records` into consecutive waves of at most `concurrency_limit`
    pub fn waves<'a>(&self, records: &'a [Record]) -> impl Iterator<Item = &'a [Record]> {
        records.chunks(self.concurrency_limit)
    }

    /// Run every record through the simulator, wave by wave
    ///
    /// # Arguments
    ///
    /// * `records` - Records in input order; sequence ids follow this order
    /// * `sink` - Receives admissions and completions
    /// * `signals` - Pause and cancellation flags owned by the caller
    ///
    /// # Returns
    ///
    /// A `RunReport` once the last wave has settled or cancellation stopped
    /// the run.
    ///
    /// # Guarantees
    ///
    /// - All admissions of a wave reach the sink before any of its completions
    /// - No record of wave k+1 is admitted before every task of wave k ended
    /// - No admission happens once cancellation is observed
    pub async fn run(
        &self,
        records: Vec<Record>,
        sink: Arc<dyn AdmissionSink>,
        signals: RunSignals,
    ) -> RunReport {
        let mut report = RunReport {
            records: records.len(),
            ..RunReport::default()
        };
        let total_waves = records.len().div_ceil(self.concurrency_limit);
        let mut next_id: SequenceId = 1;

        for (index, wave) in self.waves(&records).enumerate() {
            if signals.is_cancelled() {
                info!(wave = index + 1, total_waves, "Run cancelled before wave admission");
                break;
            }

            info!(wave = index + 1, total_waves, size = wave.len(), "Admitting wave");

            let mut admitted = Vec::with_capacity(wave.len());
            for record in wave {
                let sequence_id = next_id;
                next_id += 1;

                let outcome = self.simulator.simulate_for(sequence_id, record);
                debug!(
                    sequence_id,
                    gateway = outcome.gateway,
                    delay_ms = outcome.delay.as_millis() as u64,
                    "Record admitted"
                );
                let entry = ResultEntry::admitted(sequence_id, record.clone(), outcome.gateway);
                if !sink.on_admit(entry, &signals) {
                    break;
                }
                admitted.push((sequence_id, outcome));
            }
            report.waves += 1;
            report.admitted += admitted.len();

            let tasks: Vec<_> = admitted
                .into_iter()
                .map(|(sequence_id, outcome)| {
                    let sink = Arc::clone(&sink);
                    let signals = signals.clone();
                    let slot = InFlightSlot::acquire(Arc::clone(&self.in_flight));
                    tokio::spawn(async move {
                        let _slot = slot;
                        process_record(sequence_id, outcome, sink.as_ref(), signals).await
                    })
                })
                .collect();

            // Barrier: the next wave waits for every task of this one.
            for result in join_all(tasks).await {
                match result {
                    Ok(true) => report.completed += 1,
                    Ok(false) => report.abandoned += 1,
                    Err(e) => {
                        error!("Record task failed: {}", e);
                        report.abandoned += 1;
                    }
                }
            }
        }

        report.cancelled = signals.is_cancelled() && !report.is_complete();
        info!(
            waves = report.waves,
            admitted = report.admitted,
            completed = report.completed,
            abandoned = report.abandoned,
            cancelled = report.cancelled,
            "Run finished"
        );
        report
    }
}

/// Drive one admitted record to its outcome
///
/// Returns `true` when the completion was recorded, `false` when the record
/// was abandoned. A completion the sink holds during a pause is offered again
/// after resume.
async fn process_record(
    sequence_id: SequenceId,
    outcome: Outcome,
    sink: &dyn AdmissionSink,
    mut signals: RunSignals,
) -> bool {
    if !signals.sleep(outcome.delay).await {
        debug!(sequence_id, "Record abandoned during delay");
        return false;
    }

    let completion = Completion {
        status: outcome.status,
        response: outcome.response.to_string(),
    };

    // A pause can land between the wait and the write; the sink then holds
    // the completion and the task waits again.
    loop {
        if !signals.wait_while_paused().await {
            debug!(sequence_id, "Record abandoned while paused");
            return false;
        }

        match sink.on_complete(sequence_id, &completion, &signals) {
            Delivery::Recorded => {
                debug!(sequence_id, status = %outcome.status, "Record completed");
                return true;
            }
            Delivery::Held => continue,
            Delivery::Dropped => return false,
        }
    }
}

/// Counts one running task for as long as it lives
struct InFlightSlot(Arc<AtomicUsize>);

impl InFlightSlot {
    fn acquire(gauge: Arc<AtomicUsize>) -> Self {
        gauge.fetch_add(1, Ordering::SeqCst);
        InFlightSlot(gauge)
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result_store::{ResultStore, StoreEvent};
    use crate::core::signals::RunControl;
    use crate::types::{EntryStatus, ResultFilter};
    use parking_lot::Mutex;
    use std::time::Duration;

    fn records(n: usize) -> Vec<Record> {
        (1..=n).map(|i| Record::from(format!("line-{}", i).as_str())).collect()
    }

    fn scheduler(limit: usize) -> BatchScheduler {
        let simulator = OutcomeSimulator::seeded(Duration::from_millis(500), 11);
        BatchScheduler::new(Arc::new(simulator), limit)
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Sink that forwards to a store and records the gauge on every call
    struct GaugeSink {
        store: ResultStore,
        scheduler: BatchScheduler,
        peak: Mutex<usize>,
    }

    impl AdmissionSink for GaugeSink {
        fn on_admit(&self, entry: ResultEntry, signals: &RunSignals) -> bool {
            self.store.on_admit(entry, signals)
        }

        fn on_complete(&self, sequence_id: SequenceId, completion: &Completion, signals: &RunSignals) -> Delivery {
            let mut peak = self.peak.lock();
            *peak = (*peak).max(self.scheduler.in_flight());
            self.store.on_complete(sequence_id, completion, signals)
        }
    }

    #[test]
    fn test_waves_partition_by_position() {
        let sizes: Vec<usize> = scheduler(3).waves(&records(7)).map(|w| w.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);

        let sizes: Vec<usize> = scheduler(5).waves(&records(3)).map(|w| w.len()).collect();
        assert_eq!(sizes, vec![3]);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        assert_eq!(scheduler(0).concurrency_limit(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_wave_admits_everything_before_any_completion() {
        let store = Arc::new(ResultStore::new());
        let mut rx = store.subscribe();
        let control = RunControl::new();

        let report = scheduler(5)
            .run(records(3), store.clone(), control.signals())
            .await;

        assert_eq!(report.waves, 1);
        assert_eq!(report.completed, 3);
        assert!(!report.cancelled);

        let events = drain(&mut rx);
        let admitted: Vec<_> = events[..3]
            .iter()
            .map(|e| match e {
                StoreEvent::Admitted { entry, .. } => entry.sequence_id,
                other => panic!("expected admission, got {:?}", other),
            })
            .collect();
        assert_eq!(admitted, vec![1, 2, 3]);
        assert!(events[3..]
            .iter()
            .all(|e| matches!(e, StoreEvent::Completed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_wave_waits_for_previous_wave() {
        let store = Arc::new(ResultStore::new());
        let mut rx = store.subscribe();
        let control = RunControl::new();

        let report = scheduler(3)
            .run(records(7), store.clone(), control.signals())
            .await;

        assert_eq!(
            report,
            RunReport {
                records: 7,
                waves: 3,
                admitted: 7,
                completed: 7,
                abandoned: 0,
                cancelled: false,
            }
        );

        let events = drain(&mut rx);
        let position = |wanted: &dyn Fn(&StoreEvent) -> bool| events.iter().position(wanted).unwrap();

        let fourth_admitted = position(&|e| matches!(e, StoreEvent::Admitted { entry, .. } if entry.sequence_id == 4));
        let seventh_admitted = position(&|e| matches!(e, StoreEvent::Admitted { entry, .. } if entry.sequence_id == 7));
        for id in 1..=3 {
            let done = position(&|e| matches!(e, StoreEvent::Completed { entry, .. } if entry.sequence_id == id));
            assert!(done < fourth_admitted, "entry {} completed after wave 2 started", id);
        }
        for id in 4..=6 {
            let done = position(&|e| matches!(e, StoreEvent::Completed { entry, .. } if entry.sequence_id == id));
            assert!(done < seventh_admitted, "entry {} completed after wave 3 started", id);
        }

        let ids: Vec<_> = store.snapshot().iter().map(|e| e.sequence_id).collect();
        assert_eq!(ids, (1..=7).collect::<Vec<_>>());
        assert_eq!(store.recompute_stats().processing, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_never_exceeds_limit() {
        let scheduler = scheduler(4);
        let sink = Arc::new(GaugeSink {
            store: ResultStore::new(),
            scheduler: scheduler.clone(),
            peak: Mutex::new(0),
        });
        let control = RunControl::new();

        scheduler.run(records(10), sink.clone(), control.signals()).await;

        assert!(*sink.peak.lock() <= 4);
        assert!(*sink.peak.lock() >= 1);
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(sink.store.recompute_stats().resolved(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_completions_until_resume() {
        let store = Arc::new(ResultStore::new());
        let control = RunControl::new();
        control.set_paused(true);

        let scheduler = scheduler(3);
        let run = {
            let scheduler = scheduler.clone();
            let store = store.clone();
            let signals = control.signals();
            tokio::spawn(async move { scheduler.run(records(3), store, signals).await })
        };

        tokio::time::sleep(Duration::from_secs(30)).await;
        let stats = store.recompute_stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.processing, 3);
        assert_eq!(scheduler.in_flight(), 3);

        control.set_paused(false);
        let report = run.await.unwrap();
        assert_eq!(report.completed, 3);
        assert_eq!(store.recompute_stats().resolved(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_wave_abandons_and_stops_admission() {
        let store = Arc::new(ResultStore::new());
        let control = RunControl::new();

        let run = {
            let store = store.clone();
            let signals = control.signals();
            tokio::spawn(async move { scheduler(3).run(records(7), store, signals).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        control.cancel();
        let report = run.await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.waves, 1);
        assert_eq!(report.admitted, 3);
        assert_eq!(report.abandoned, 3);
        assert_eq!(store.len(), 3);
        let processing = store
            .filtered_snapshot(ResultFilter::All)
            .iter()
            .filter(|e| e.status == EntryStatus::Processing)
            .count();
        assert_eq!(processing, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_pause_returns_without_waiting_for_resume() {
        let store = Arc::new(ResultStore::new());
        let control = RunControl::new();
        control.set_paused(true);

        let run = {
            let store = store.clone();
            let signals = control.signals();
            tokio::spawn(async move { scheduler(2).run(records(4), store, signals).await })
        };

        tokio::time::sleep(Duration::from_secs(10)).await;
        control.cancel();
        let report = run.await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.completed, 0);
        assert_eq!(report.abandoned, 2);
        assert_eq!(store.recompute_stats().resolved(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_admits_nothing() {
        let store = Arc::new(ResultStore::new());
        let control = RunControl::new();
        control.cancel();

        let report = scheduler(3).run(records(5), store.clone(), control.signals()).await;

        assert!(report.cancelled);
        assert_eq!(report.waves, 0);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_runs_are_reproducible() {
        let outcomes = |store: &ResultStore| -> Vec<(String, EntryStatus, String)> {
            store
                .snapshot()
                .into_iter()
                .map(|e| (e.gateway, e.status, e.response))
                .collect()
        };

        let control = RunControl::new();
        let first = Arc::new(ResultStore::new());
        let second = Arc::new(ResultStore::new());
        scheduler(4).run(records(9), first.clone(), control.signals()).await;
        scheduler(2).run(records(9), second.clone(), control.signals()).await;

        assert_eq!(outcomes(&first), outcomes(&second));
    }
}
