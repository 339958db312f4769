//! Statistics for a single harvest run

use crate::catalog::MergeSummary;
use crate::state::PageState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt::Write;

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// When the crawl started
    pub started_at: DateTime<Utc>,

    /// When the crawl (including merge) finished
    pub finished_at: DateTime<Utc>,

    /// Count of pages by terminal state
    pub pages_by_state: HashMap<PageState, u64>,

    /// URLs admitted to the frontier, including the seed
    pub urls_discovered: u64,

    /// Product records scraped during the run
    pub products_scraped: u64,

    /// What the merge did to the catalog, if it ran
    pub merge: Option<MergeSummary>,

    /// True if the crawl was cancelled before the frontier drained
    pub interrupted: bool,
}

impl CrawlStatistics {
    /// Creates empty statistics for a run starting now
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            pages_by_state: HashMap::new(),
            urls_discovered: 0,
            products_scraped: 0,
            merge: None,
            interrupted: false,
        }
    }

    /// Number of pages that reached the given state
    pub fn count(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Number of pages a worker picked up
    pub fn total_pages(&self) -> u64 {
        self.pages_by_state.values().sum()
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Renders statistics as the plain-text block printed after a run
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Harvest Statistics ===\n");
    let _ = writeln!(out, "Run:");
    let _ = writeln!(out, "  Started: {}", stats.started_at.to_rfc3339());
    let _ = writeln!(out, "  Duration: {}s", stats.duration().num_seconds());
    if stats.interrupted {
        let _ = writeln!(out, "  Interrupted before the frontier drained");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Pages:");
    let _ = writeln!(out, "  URLs discovered: {}", stats.urls_discovered);
    let total = stats.total_pages();
    for state in PageState::all_states().into_iter().filter(|s| s.is_terminal()) {
        let count = stats.count(state);
        if count == 0 {
            continue;
        }
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", state, count, percentage);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Products:");
    let _ = writeln!(out, "  Scraped: {}", stats.products_scraped);
    if let Some(merge) = &stats.merge {
        let _ = writeln!(out, "  Added to catalog: {}", merge.added);
        let _ = writeln!(out, "  Updated in catalog: {}", merge.updated);
        let _ = writeln!(out, "  Unchanged: {}", merge.unchanged);
        let _ = writeln!(out, "  Without id (not merged): {}", merge.skipped);
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
