//! Lifecycle of a single run
//!
//! This module provides the `SessionController` struct, which pairs one
//! [`ResultStore`] with the scheduler of the current run and exposes the
//! operator actions: start, pause, resume, stop and reset.
//!
//! # State Machine
//!
//! ```text
//! AwaitingInput ──start──► Running ◄──pause/resume──► Paused
//!                             │                          │
//!                             ├──drained──► Completed ◄──┤
//!                             └──stop─────► Stopped  ◄───┘
//! Completed / Stopped ──reset──► AwaitingInput
//! ```
//!
//! Every operation validates the current state synchronously and returns a
//! `RunnerError` when it does not apply; a rejected operation changes nothing.
//!
//! # Runtime
//!
//! `start` spawns the run on the current tokio runtime and must be called from
//! within one.

use crate::core::config::SessionConfig;
use crate::core::result_store::{ResultStore, StoreEvent};
use crate::core::scheduler::{BatchScheduler, RunReport};
use crate::core::signals::RunControl;
use crate::core::simulator::OutcomeSimulator;
use crate::types::{Record, ResultEntry, ResultFilter, RunnerError, SequenceId, SessionState, SessionStats};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Session state plus the number of the run it belongs to
///
/// The run number lets a finishing run tell whether the session has moved on
/// to a newer run since it was started.
#[derive(Debug)]
struct Lifecycle {
    state: SessionState,
    run: u64,
}

/// Handles of the run in progress
#[derive(Debug)]
struct ActiveRun {
    control: RunControl,
    scheduler: BatchScheduler,
    config: SessionConfig,
}

/// Orchestrates one session
///
/// All methods take `&self`; the controller can be shared behind an `Arc`
/// between an operator front end and observers.
#[derive(Debug)]
pub struct SessionController {
    store: Arc<ResultStore>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    active: Mutex<Option<ActiveRun>>,
    handle: Mutex<Option<JoinHandle<RunReport>>>,
    seed: Option<u64>,
}

impl SessionController {
    /// Create a controller in `AwaitingInput` drawing outcomes from entropy
    pub fn new() -> Self {
        Self::with_seed(None)
    }

    /// Create a controller whose runs draw outcomes from `seed`
    pub fn with_seed(seed: Option<u64>) -> Self {
        Self {
            store: Arc::new(ResultStore::new()),
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                state: SessionState::AwaitingInput,
                run: 0,
            })),
            active: Mutex::new(None),
            handle: Mutex::new(None),
            seed,
        }
    }

    /// Start a run over `records`
    ///
    /// # Arguments
    ///
    /// * `records` - Parsed records in input order
    /// * `speed_ms` - Base delay per record, 500..=5000
    /// * `concurrency_limit` - Wave size, 1..=20
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The run is spawned and the session is `Running`
    /// * `Err(RunnerError::AlreadyRunning)` - A run is in progress
    /// * `Err(RunnerError::ResetRequired)` - The previous run has not been reset
    /// * `Err(RunnerError::InvalidConcurrency | InvalidSpeed)` - Bad parameters
    /// * `Err(RunnerError::NoRecords)` - Nothing to process
    pub fn start(
        &self,
        records: Vec<Record>,
        speed_ms: u64,
        concurrency_limit: usize,
    ) -> Result<(), RunnerError> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            SessionState::AwaitingInput => {}
            state if state.is_active() => return Err(RunnerError::AlreadyRunning { state }),
            state => return Err(RunnerError::ResetRequired { state }),
        }

        let config = SessionConfig::new(speed_ms, concurrency_limit)?;
        if records.is_empty() {
            return Err(RunnerError::NoRecords);
        }

        let simulator = match self.seed {
            Some(seed) => OutcomeSimulator::seeded(config.base_delay(), seed),
            None => OutcomeSimulator::new(config.base_delay()),
        };
        let scheduler = BatchScheduler::new(Arc::new(simulator), config.concurrency_limit());
        let control = RunControl::new();

        lifecycle.run += 1;
        lifecycle.state = SessionState::Running;
        let run = lifecycle.run;
        info!(
            run,
            records = records.len(),
            speed_ms = config.speed_ms(),
            concurrency = config.concurrency_limit(),
            "Session started"
        );

        let handle = {
            let scheduler = scheduler.clone();
            let store = Arc::clone(&self.store);
            let signals = control.signals();
            let lifecycle = Arc::clone(&self.lifecycle);
            tokio::spawn(async move {
                let report = scheduler.run(records, store, signals).await;

                let mut lifecycle = lifecycle.lock();
                if lifecycle.run == run && lifecycle.state.is_active() {
                    lifecycle.state = SessionState::Completed;
                    info!(run, "Session completed");
                }
                report
            })
        };

        *self.active.lock() = Some(ActiveRun {
            control,
            scheduler,
            config,
        });
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Freeze completions of in-flight records
    ///
    /// Delays keep elapsing; records whose delay ends while paused hold their
    /// outcome until `resume`.
    pub fn pause(&self) -> Result<(), RunnerError> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            SessionState::Running => {
                self.with_control(|control| control.set_paused(true));
                // No completion lands once pause returns.
                self.store.fence();
                lifecycle.state = SessionState::Paused;
                info!(run = lifecycle.run, "Session paused");
                Ok(())
            }
            SessionState::Paused => Err(warned(RunnerError::AlreadyPaused)),
            state => Err(warned(RunnerError::not_running("pause", state))),
        }
    }

    /// Let held completions land and the run continue
    pub fn resume(&self) -> Result<(), RunnerError> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            SessionState::Paused => {
                self.with_control(|control| control.set_paused(false));
                lifecycle.state = SessionState::Running;
                info!(run = lifecycle.run, "Session resumed");
                Ok(())
            }
            SessionState::Running => Err(warned(RunnerError::NotPaused)),
            state => Err(warned(RunnerError::not_running("resume", state))),
        }
    }

    /// Pause a running session or resume a paused one
    ///
    /// # Returns
    ///
    /// The state after the toggle.
    pub fn toggle_pause(&self) -> Result<SessionState, RunnerError> {
        match self.state() {
            SessionState::Running => self.pause().map(|()| SessionState::Paused),
            SessionState::Paused => self.resume().map(|()| SessionState::Running),
            state => Err(warned(RunnerError::not_running("toggle pause", state))),
        }
    }

    /// Cancel the run in place
    ///
    /// Entries already resolved stay as they are; in-flight entries stay
    /// `Processing`. Once this returns no admission or completion of the
    /// cancelled run can reach the store.
    pub fn stop(&self) -> Result<(), RunnerError> {
        let mut lifecycle = self.lifecycle.lock();
        if !lifecycle.state.is_active() {
            return Err(warned(RunnerError::not_running("stop", lifecycle.state)));
        }

        self.with_control(|control| {
            control.cancel();
            control.set_paused(false);
        });
        // Any writer that raced the cancel flag finishes before we report stopped.
        self.store.fence();

        lifecycle.state = SessionState::Stopped;
        info!(run = lifecycle.run, stats = %self.store.recompute_stats(), "Session stopped");
        Ok(())
    }

    /// Discard all results and return to `AwaitingInput`
    pub fn reset(&self) -> Result<(), RunnerError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state.is_active() {
            return Err(warned(RunnerError::ResetWhileActive {
                state: lifecycle.state,
            }));
        }

        self.active.lock().take();
        // A stopped run may still be unwinding; it can no longer write.
        self.handle.lock().take();
        self.store.clear();

        lifecycle.state = SessionState::AwaitingInput;
        info!(run = lifecycle.run, "Session reset");
        Ok(())
    }

    /// Mark an approved entry as charged
    ///
    /// Allowed while the run is in progress and after it ended, until reset.
    pub fn mark_charged(&self, sequence_id: SequenceId) -> Result<ResultEntry, RunnerError> {
        self.store
            .mark_charged(sequence_id)
            .inspect(|_| info!(sequence_id, "Entry charged"))
            .map_err(warned)
    }

    /// Wait for the current run to finish
    ///
    /// # Returns
    ///
    /// * `Some(RunReport)` - The run's summary
    /// * `None` - No run was started, it was already joined, or its task failed
    pub async fn join(&self) -> Option<RunReport> {
        let handle = self.handle.lock().take()?;
        match handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Run task failed: {}", e);
                None
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.lock().state
    }

    /// Parameters of the current or last run
    pub fn config(&self) -> Option<SessionConfig> {
        self.active.lock().as_ref().map(|run| run.config)
    }

    /// Number of records currently in flight
    ///
    /// The current wave size while a run is active, 0 otherwise.
    pub fn in_flight(&self) -> usize {
        if !self.state().is_active() {
            return 0;
        }
        self.active
            .lock()
            .as_ref()
            .map_or(0, |run| run.scheduler.in_flight())
    }

    /// Entries passing `filter`, in sequence order
    pub fn snapshot(&self, filter: ResultFilter) -> Vec<ResultEntry> {
        self.store.filtered_snapshot(filter)
    }

    /// Entries passing `filter` together with the statistics of the same instant
    pub fn view(&self, filter: ResultFilter) -> (Vec<ResultEntry>, SessionStats) {
        self.store.view(filter)
    }

    pub fn stats(&self) -> SessionStats {
        self.store.recompute_stats()
    }

    /// Subscribe to admission, completion and charge notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<ResultStore> {
        Arc::clone(&self.store)
    }

    fn with_control(&self, f: impl FnOnce(&RunControl)) {
        if let Some(run) = self.active.lock().as_ref() {
            f(&run.control);
        }
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

fn warned(error: RunnerError) -> RunnerError {
    warn!("Operation rejected: {}", error);
    error
}
