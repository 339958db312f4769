//! Output module for run reporting
//!
//! This module turns the counters of a finished crawl (and of the merge that
//! followed it) into the statistics summary printed at the end of a run.

pub mod stats;

pub use stats::{format_statistics, print_statistics, CrawlStatistics};
