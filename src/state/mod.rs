//! State module for tracking crawl progress
//!
//! - `PageState`: the lifecycle of a single URL in the frontier

mod page_state;

pub use page_state::PageState;
