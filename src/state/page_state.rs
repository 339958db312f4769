//! Page state definitions for tracking crawl progress
//!
//! Every URL moves `Pending → InFlight → {Parsed, Skipped, Failed}` and never
//! returns to `Pending`.
use std::fmt;

/// Represents the current state of a URL in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// URL is in the frontier queue waiting for a worker
    Pending,

    /// A worker is fetching or parsing the URL
    InFlight,

    // ===== Terminal States =====
    /// Document was fetched and parsed
    Parsed,

    /// Work on the URL was abandoned because the crawl was cancelled
    Skipped,

    /// Every fetch attempt failed
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InFlight)
    }

    /// Returns true if the transition `self -> next` is part of the lifecycle
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::Pending, Self::Skipped)
                | (Self::InFlight, Self::Parsed)
                | (Self::InFlight, Self::Skipped)
                | (Self::InFlight, Self::Failed)
        )
    }

    /// Short lowercase label used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Parsed => "parsed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> [Self; 5] {
        [
            Self::Pending,
            Self::InFlight,
            Self::Parsed,
            Self::Skipped,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
