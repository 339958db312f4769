//! Crawl frontier shared by all workers
//!
//! The frontier owns the seen-set and the pending queue behind one mutex, so
//! the "already seen?" check and the insert are a single critical section.
//! Termination is tracked with an outstanding-item counter rather than by
//! looking at queue emptiness: an item stays outstanding from the moment it is
//! enqueued until the worker that took it calls [`Frontier::complete`], which
//! it only does after enqueueing everything it discovered.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct FrontierState {
    /// Every URL ever admitted; never shrinks
    seen: HashSet<String>,
    /// URLs waiting for a worker
    pending: VecDeque<String>,
}

/// Why [`Frontier::push`] did not admit a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushRejection {
    /// The URL was admitted earlier in the crawl
    Duplicate,
    /// The frontier already admitted `max_pages` URLs
    LimitReached,
    /// The crawl was cancelled
    Closed,
}

/// A deduplicated, closable work queue with completion tracking
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    outstanding: AtomicUsize,
    closed: AtomicBool,
    max_pages: usize,
    notify: Notify,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// `max_pages` caps how many URLs are ever admitted; 0 means no cap.
    pub fn new(max_pages: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            outstanding: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            max_pages,
            notify: Notify::new(),
        }
    }

    /// Admits a URL key if it has never been seen
    ///
    /// The caller is expected to pass a frontier key (see
    /// [`crate::url::frontier_key`]).
    pub fn push(&self, url: impl Into<String>) -> Result<(), PushRejection> {
        if self.is_closed() {
            return Err(PushRejection::Closed);
        }

        let url = url.into();
        {
            let mut state = self.lock();
            if state.seen.contains(&url) {
                return Err(PushRejection::Duplicate);
            }
            if self.max_pages > 0 && state.seen.len() >= self.max_pages {
                return Err(PushRejection::LimitReached);
            }
            state.seen.insert(url.clone());
            state.pending.push_back(url);
            self.outstanding.fetch_add(1, Ordering::SeqCst);
        }

        self.notify.notify_waiters();
        Ok(())
    }

    /// Admits every URL it has not seen yet, returning how many were admitted
    pub fn extend<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut admitted = 0;
        for url in urls {
            match self.push(url) {
                Ok(()) => admitted += 1,
                Err(PushRejection::Closed) => break,
                Err(PushRejection::Duplicate | PushRejection::LimitReached) => {}
            }
        }
        admitted
    }

    /// Waits for the next URL to process
    ///
    /// # Returns
    ///
    /// * `Some(url)` - Work for the calling worker; call [`Frontier::complete`] when done
    /// * `None` - The crawl has converged (nothing pending and nothing in flight)
    ///   or the frontier was closed
    pub async fn next(&self) -> Option<String> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Registered before the checks below.
            notified.as_mut().enable();

            if self.is_closed() {
                return None;
            }
            if let Some(url) = self.lock().pending.pop_front() {
                return Some(url);
            }
            if self.outstanding.load(Ordering::SeqCst) == 0 {
                return None;
            }

            notified.await;
        }
    }

    /// Marks one item returned by [`Frontier::next`] as finished
    pub fn complete(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "complete() called more often than next()");
        if previous == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Stops the crawl: pending URLs are dropped and every waiter returns `None`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Returns true once [`Frontier::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolves once the frontier is closed
    pub async fn closed(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    /// Number of URLs waiting for a worker
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of URLs ever admitted
    pub fn seen_len(&self) -> usize {
        self.lock().seen.len()
    }

    /// Number of admitted URLs not yet completed (pending plus in flight)
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new(0)
    }
}
