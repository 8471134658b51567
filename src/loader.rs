//! Last-result-wins guard for overlapping feed loads.
//!
//! Each load takes a ticket when it starts. When it finishes, its result is
//! handed back only if no later load has started in the meantime.
//! Periodic refreshes go through [`FeedLoader::try_load`] instead, which
//! refuses to start while another refresh is still running.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct FeedLoader {
    latest: AtomicU64,
    busy: AtomicBool,
}

/// Clears the busy flag when the refresh ends, including on cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl FeedLoader {
    pub fn new() -> Self {
        FeedLoader::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Run `fetch` under a fresh ticket. `None` means a newer load superseded it.
    pub async fn load<T, F>(&self, fetch: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let ticket = self.begin();
        let result = fetch.await;
        if self.is_current(ticket) {
            Some(result)
        } else {
            log::debug!("discarding superseded load #{}", ticket.0);
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Like [`load`](Self::load), but returns `None` at once without polling
    /// `fetch` when an earlier `try_load` has not finished yet.
    pub async fn try_load<T, F>(&self, fetch: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if self.busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            log::debug!("previous refresh still running, skipping");
            return None;
        }
        let _in_flight = InFlight(&self.busy);
        self.load(fetch).await
    }
}
