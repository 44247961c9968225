/*!
`quickmatch` is a concurrent fuzzy-matching engine for interactive finders.

A producer thread (the embedder, e.g. a TUI event loop) pushes byte-string
items and sets a query; a fixed pool of worker OS threads score items
against the query and merge their results through a binomial tree rooted
at worker 0, whose publication triggers a user-supplied callback. The
consumer polls the engine for the latest snapshot rather than being handed
results synchronously, so a slow or backed-up scoring pass never blocks
the UI thread.

None of the engine's hot paths allocate per item or per match beyond
amortized vector growth: haystacks live in the [`Items`] arena, matches are
packed into a single `i64` (see [`results::Match`]), and worker output is
handed off through a wait-free triple buffer split into writer and
reader halves ([`tx::TxWriter`] and [`tx::TxReader`]).

See [`Engine`] for the facade used by embedders.
*/

mod config;
mod error;
mod events;
mod items;
mod job;
mod results;
mod tx;
mod worker;


pub use crate::config::EngineConfig;
pub use crate::error::EngineError;
pub use crate::items::Items;
pub use crate::results::Match;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::job::{Job, Query};
use crate::results::Results;
use crate::tx::{value_tx, TxReader};
use crate::worker::{children_of, parent_of, spawn_workers, WorkerContext, WorkerFailure, WorkerHandle};

/// A single scored item as returned by [`Engine::get_result`].
#[derive(Debug, Clone, Copy)]
pub struct ResultItem<'a> {
    pub index: u32,
    pub score: f32,
    pub text: &'a [u8],
}

/// The concurrent matching engine.
///
/// Not `Sync`: all producer-side methods (`push_item`, `set_query`,
/// `commit`, the `*result*` readers) are meant to be called from one
/// thread, matching the single-writer/single-reader contract of
/// [`tx::TxWriter`]/[`tx::TxReader`] and the append-only discipline of
/// [`Items`].
pub struct Engine {
    items: Items,
    query: Query,
    query_tick: u64,
    config: EngineConfig,
    job: Arc<Mutex<Job>>,
    callback: Arc<dyn Fn() + Send + Sync>,
    handles: Vec<WorkerHandle>,
    master: Option<TxReader<Results>>,
    running: bool,
}

impl Engine {
    /// `callback` is invoked (from a worker thread) after every successful
    /// publication at worker 0. It must not call back into the engine
    /// synchronously; the convention is to wake an external event loop.
    pub fn new(config: EngineConfig, callback: Arc<dyn Fn() + Send + Sync>) -> Self {
        Engine {
            items: Items::new(),
            query: None,
            query_tick: 0,
            config,
            job: Arc::new(Mutex::new(Job::new(Items::new(), None, 0, 0))),
            callback,
            handles: Vec::new(),
            master: None,
            running: false,
        }
    }

    /// Appends a haystack to the item arena. Producer-thread only.
    pub fn push_item(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        self.items.push(bytes)
    }

    /// Replaces the active query. A no-op (no tick bump, no re-job) if
    /// `needle` is byte-identical to the current query.
    pub fn set_query(&mut self, needle: &[u8]) {
        let new_query: Query = if needle.is_empty() {
            None
        } else {
            Some(Arc::from(needle))
        };
        let unchanged = match (&self.query, &new_query) {
            (None, None) => true,
            (Some(a), Some(b)) => a.as_ref() == b.as_ref(),
            _ => false,
        };
        if unchanged {
            return;
        }
        self.query = new_query;
        self.query_tick += 1;
    }

    /// Publishes the current items/query state as a new job, if either
    /// has changed since the last commit. Returns `true` if a new job was
    /// published. Requires the engine to be [`Engine::start`]ed.
    pub fn commit(&mut self) -> Result<bool, EngineError> {
        if !self.running {
            return Err(EngineError::InvalidState("commit() called before start()"));
        }
        let items_tick = self.items.size() as u64;
        let mut job = self.job.lock();
        if job.items_tick == items_tick && job.query_tick == self.query_tick {
            return Ok(false);
        }
        *job = Job::new(self.items.clone(), self.query.clone(), items_tick, self.query_tick);
        drop(job);
        log::debug!(
            "committing job (items_tick={items_tick}, query_tick={})",
            self.query_tick
        );
        for handle in &self.handles {
            handle.events.post(worker::JOB);
        }
        Ok(true)
    }

    /// Asks worker 0's output to load the latest commit. Returns whether
    /// newer results are now visible via [`Engine::get_result`].
    pub fn load_results(&mut self) -> bool {
        self.master.as_mut().is_some_and(|r| r.load())
    }

    /// Number of results currently visible: the master worker's match
    /// count if a query is active, otherwise the raw item count.
    pub fn results_size(&self) -> usize {
        if self.query.is_some() {
            self.master
                .as_ref()
                .map_or(0, |r| r.read_buffer().matches.len())
        } else {
            self.items.size()
        }
    }

    /// Returns the `i`-th result in the current snapshot.
    pub fn get_result(&self, i: usize) -> Option<ResultItem<'_>> {
        if self.query.is_some() {
            let results = self.master.as_ref()?.read_buffer();
            let m = *results.matches.get(i)?;
            Some(ResultItem {
                index: m.index(),
                score: m.score() * quickmatch_matcher::SCORE_DISPLAY_MULTIPLIER,
                text: self.items.at(m.index() as usize),
            })
        } else {
            if i >= self.items.size() {
                return None;
            }
            Some(ResultItem {
                index: i as u32,
                score: 0.0,
                text: self.items.at(i),
            })
        }
    }

    /// True iff worker 0's latest loaded results match the facade's
    /// current items size and query tick — i.e. there is no in-flight
    /// job the consumer hasn't seen the output of yet.
    pub fn synchronized(&self) -> bool {
        let Some(master) = &self.master else {
            return false;
        };
        let results = master.read_buffer();
        results.items_tick == self.items.size() as u64 && results.query_tick == self.query_tick
    }

    /// Best-effort ratio, in `[0, 1]`, of items reserved by workers to
    /// total items in the current job. Approximates items *reserved*, not
    /// items actually scored.
    pub fn progress(&self) -> f32 {
        let job = self.job.lock();
        let total = job.items.size();
        if total == 0 {
            return 1.0;
        }
        let reserved = job
            .reservation
            .load(std::sync::atomic::Ordering::Relaxed)
            .min(total);
        reserved as f32 / total as f32
    }

    /// The first worker failure message observed, if any worker has
    /// entered its terminal failure state.
    pub fn worker_failure(&self) -> Option<String> {
        self.handles.iter().find_map(|h| h.failure.message())
    }

    /// Changes the worker pool size for the next [`Engine::start`]. Clamps
    /// to `1..=EngineConfig::MAX_THREADS`. Only permitted while stopped.
    pub fn set_thread_count(&mut self, n: usize) -> Result<(), EngineError> {
        if self.running {
            return Err(EngineError::InvalidState(
                "set_thread_count() called while running",
            ));
        }
        self.config.thread_count = n.clamp(1, EngineConfig::MAX_THREADS);
        Ok(())
    }

    /// Spawns the worker pool. The worker count may only change while
    /// stopped.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.running {
            return Err(EngineError::InvalidState("start() called while already running"));
        }
        let n = self.config.thread_count;

        let mut writers = Vec::with_capacity(n);
        let mut readers: Vec<Option<TxReader<Results>>> = Vec::with_capacity(n);
        for _ in 0..n {
            let (w, r) = value_tx(Results::default());
            writers.push(Some(w));
            readers.push(Some(r));
        }

        let events: Vec<Arc<crate::events::Events>> =
            (0..n).map(|_| Arc::new(crate::events::Events::new())).collect();
        let failures: Vec<Arc<WorkerFailure>> = (0..n).map(|_| Arc::new(WorkerFailure::default())).collect();
        let children = children_of(n);

        let master_reader = readers[0].take();

        let mut contexts = Vec::with_capacity(n);
        for i in 0..n {
            let my_children = children[i].clone();
            contexts.push(WorkerContext {
                id: i,
                events: events[i].clone(),
                parent_events: parent_of(i).map(|p| events[p].clone()),
                output: writers[i].take().expect("writer taken twice"),
                children: my_children
                    .iter()
                    .map(|&c| readers[c].take().expect("reader taken twice"))
                    .collect(),
                children_failures: my_children.iter().map(|&c| failures[c].clone()).collect(),
                job: self.job.clone(),
                config: self.config,
                failure: failures[i].clone(),
                callback: if i == 0 { Some(self.callback.clone()) } else { None },
            });
        }

        self.handles = spawn_workers(contexts);
        self.master = master_reader;
        self.running = true;
        log::debug!("engine started with {n} workers");
        Ok(())
    }

    /// Posts `STOP` to every worker and joins them.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        for handle in self.handles.drain(..) {
            handle.stop();
        }
        self.running = false;
        log::debug!("engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}
