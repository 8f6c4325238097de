//! Session-level types: aggregate statistics, lifecycle state and read filters

use super::record::{EntryStatus, ResultEntry};
use clap::ValueEnum;
use std::fmt;

/// Aggregate counters derived from the result store
///
/// Always recomputed from the entries; never mutated independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total: usize,
    pub approved: usize,
    pub declined: usize,
    pub processing: usize,
}

impl SessionStats {
    /// Tally the given entries
    pub fn tally<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a ResultEntry>,
    {
        entries
            .into_iter()
            .fold(SessionStats::default(), |mut stats, entry| {
                stats.total += 1;
                match entry.status {
                    EntryStatus::Processing => stats.processing += 1,
                    EntryStatus::Approved => stats.approved += 1,
                    EntryStatus::Declined => stats.declined += 1,
                }
                stats
            })
    }

    /// Number of entries that have left `Processing`
    pub fn resolved(&self) -> usize {
        self.approved + self.declined
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} approved={} declined={} processing={}",
            self.total, self.approved, self.declined, self.processing
        )
    }
}

/// Lifecycle of one session
///
/// ```text
/// AwaitingInput -> Running <-> Paused -> Completed
///                  Running/Paused     -> Stopped
/// Completed/Stopped --reset--> AwaitingInput
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Running,
    Paused,
    Completed,
    Stopped,
}

impl SessionState {
    /// Whether a run is in progress (running or paused)
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }

    /// Whether the run has ended, normally or by operator stop
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::AwaitingInput => "awaiting-input",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Read-layer filter over result entries
///
/// Filtering never mutates entries or their order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ResultFilter {
    #[default]
    All,
    #[value(name = "approved")]
    ApprovedOnly,
    #[value(name = "declined")]
    DeclinedOnly,
}

impl ResultFilter {
    /// Whether the entry passes this filter
    pub fn matches(self, entry: &ResultEntry) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::ApprovedOnly => entry.status == EntryStatus::Approved,
            ResultFilter::DeclinedOnly => entry.status == EntryStatus::Declined,
        }
    }
}
