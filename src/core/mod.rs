//! Core business logic module
//!
//! This module contains the batch execution components:
//! - `traits` - Seam between the scheduler and where results land
//! - `simulator` - Pseudo-random gateway outcomes
//! - `signals` - Pause and cancellation flags shared with in-flight tasks
//! - `scheduler` - Wave-by-wave admission and per-record tasks
//! - `result_store` - Ordered results, derived statistics and change events
//! - `session` - Run lifecycle orchestration
//! - `config` - Validated run parameters
//! - `gate` - Shared-secret access check

pub mod config;
pub mod gate;
pub mod result_store;
pub mod scheduler;
pub mod session;
pub mod signals;
pub mod simulator;
pub mod traits;

pub use config::SessionConfig;
pub use gate::{AccessGate, SECRET_ENV};
pub use result_store::{ResultStore, StoreEvent};
pub use scheduler::{BatchScheduler, RunReport};
pub use session::SessionController;
pub use signals::{RunControl, RunSignals};
pub use simulator::{Outcome, OutcomeSimulator};
pub use traits::{AdmissionSink, Delivery};
