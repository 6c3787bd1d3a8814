use std::fmt;

/// Counters for one completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub duplicates: usize,
    pub past: usize,
    pub failed: usize,
    /// Candidates whose times do not exist in the configured zone
    pub invalid: usize,
}

/// Where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    NothingRetrieved,
    NoRelevantUpdate,
    NoEvents,
    Completed(RunSummary),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NothingRetrieved => write!(f, "nothing retrieved"),
            RunOutcome::NoRelevantUpdate => write!(f, "no relevant update"),
            RunOutcome::NoEvents => write!(f, "no events to schedule"),
            RunOutcome::Completed(s) => write!(
                f,
                "{} created, {} duplicate, {} past, {} failed, {} invalid",
                s.created, s.duplicates, s.past, s.failed, s.invalid
            ),
        }
    }
}
