//! The unit of work a worker consumes: a shared items snapshot plus the
//! query it should be scored against.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crate::items::Items;

/// A needle, shared cheaply across all workers scoring the same job.
///
/// `None` represents the empty query: workers skip scoring entirely and
/// report items in arena order (see the worker's empty-query fast path).
pub type Query = Option<Arc<[u8]>>;

/// A published unit of work.
///
/// Cloning a `Job` is cheap: `items` is an `Arc` bump and `query` is an
/// `Arc<[u8]>` bump (or `None`). Workers hold their own clone for the
/// duration of a scoring pass so a concurrent [`crate::Engine::commit`]
/// can publish the next job without disturbing work in flight.
#[derive(Clone)]
pub struct Job {
    pub items: Items,
    pub query: Query,
    /// Shared chunk-reservation cursor: workers claim disjoint ranges of
    /// `items` by fetch-adding this counter, in [`crate::config::EngineConfig::chunk_size`]
    /// increments, until it runs past `items.size()`.
    pub reservation: Arc<AtomicUsize>,
    /// Size of the items snapshot this job was published with, used by
    /// workers and the merge tree to tell "same job" results apart from
    /// stale ones left over from a superseded job.
    pub items_tick: u64,
    /// Tick of the query this job was published with. Bumped by
    /// [`crate::Engine::set_query`] independently of `items_tick`.
    pub query_tick: u64,
}

impl Job {
    pub fn new(items: Items, query: Query, items_tick: u64, query_tick: u64) -> Self {
        Job {
            items,
            query,
            reservation: Arc::new(AtomicUsize::new(0)),
            items_tick,
            query_tick,
        }
    }

    /// Reserves the next chunk of up to `chunk_size` item indices.
    ///
    /// Returns `None` once the whole arena has been claimed. Multiple
    /// workers may call this concurrently; each index is handed out to
    /// exactly one caller.
    pub fn reserve_chunk(&self, chunk_size: usize) -> Option<std::ops::Range<usize>> {
        let total = self.items.size();
        let start = self
            .reservation
            .fetch_add(chunk_size, std::sync::atomic::Ordering::Relaxed);
        if start >= total {
            return None;
        }
        Some(start..total.min(start + chunk_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items_with(n: usize) -> Items {
        let mut items = Items::new();
        for i in 0..n {
            items.push(format!("item-{i}").as_bytes()).unwrap();
        }
        items
    }

    #[test]
    fn reserve_chunk_covers_every_index_exactly_once() {
        let job = Job::new(items_with(10), None, 0, 0);
        let mut seen = vec![false; 10];
        while let Some(range) = job.reserve_chunk(3) {
            for i in range {
                assert!(!seen[i], "index {i} reserved twice");
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&b| b));
    }

    #[test]
    fn reserve_chunk_exhausts_on_empty_items() {
        let job = Job::new(Items::new(), None, 0, 0);
        assert!(job.reserve_chunk(16384).is_none());
    }

    #[test]
    fn concurrent_reservations_do_not_overlap() {
        use std::thread;

        let job = Arc::new(Job::new(items_with(10_000), None, 0, 0));
        let mut handles = Vec::new();
        let claimed: Arc<std::sync::Mutex<Vec<usize>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        for _ in 0..8 {
            let job = job.clone();
            let claimed = claimed.clone();
            handles.push(thread::spawn(move || {
                let mut mine = Vec::new();
                while let Some(range) = job.reserve_chunk(64) {
                    mine.extend(range);
                }
                claimed.lock().unwrap().extend(mine);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let mut all = claimed.lock().unwrap().clone();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 10_000);
    }
}
