//! Worker thread loop: reserve, score, sort, merge, publish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use quickmatch_matcher::Matcher;

use crate::config::EngineConfig;
use crate::events::Events;
use crate::job::Job;
use crate::results::{Match, Results};
use crate::tx::{TxReader, TxWriter};

pub(crate) const JOB: u32 = 0b001;
pub(crate) const STOP: u32 = 0b010;
pub(crate) const MERGE: u32 = 0b100;

/// A worker's terminal failure state: a message plus a flag, so the
/// allocation-failure path itself never needs to allocate.
#[derive(Default)]
pub struct WorkerFailure {
    failed: AtomicBool,
    message: Mutex<Option<String>>,
}

impl WorkerFailure {
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn message(&self) -> Option<String> {
        self.message.lock().clone()
    }

    fn record(&self, msg: impl Into<String>) {
        *self.message.lock() = Some(msg.into());
        self.failed.store(true, Ordering::Release);
    }
}

/// Computes, for every worker index, the index of the worker whose
/// `commit()` feeds this worker's merge step: the index with its lowest
/// set bit cleared. Worker 0 has no parent.
pub(crate) fn parent_of(i: usize) -> Option<usize> {
    if i == 0 {
        None
    } else {
        Some(i & (i - 1))
    }
}

/// Builds the full child list for a tree of `n` workers: `children[i]` is
/// every worker whose parent (per [`parent_of`]) is `i`.
pub(crate) fn children_of(n: usize) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); n];
    for j in 1..n {
        children[j & (j - 1)].push(j);
    }
    children
}

/// Resources the engine keeps for each worker: enough to post events to
/// it, observe whether it has failed, and join it on `stop()`.
pub(crate) struct WorkerHandle {
    pub events: Arc<Events>,
    pub failure: Arc<WorkerFailure>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn stop(mut self) {
        self.events.post(STOP);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Everything a single worker thread owns or is lent for its lifetime.
pub(crate) struct WorkerContext {
    pub id: usize,
    pub events: Arc<Events>,
    pub parent_events: Option<Arc<Events>>,
    pub output: TxWriter<Results>,
    pub children: Vec<TxReader<Results>>,
    pub children_failures: Vec<Arc<WorkerFailure>>,
    pub job: Arc<Mutex<Job>>,
    pub config: EngineConfig,
    pub failure: Arc<WorkerFailure>,
    /// Invoked after worker 0 commits. `None` for every other worker.
    pub callback: Option<Arc<dyn Fn() + Send + Sync>>,
}

/// Spawns one worker thread per entry of `contexts` and returns a handle
/// per worker (in the same order) that the engine keeps for event
/// delivery and shutdown.
pub(crate) fn spawn_workers(contexts: Vec<WorkerContext>) -> Vec<WorkerHandle> {
    contexts
        .into_iter()
        .map(|ctx| {
            let events = ctx.events.clone();
            let failure = ctx.failure.clone();
            let join = thread::Builder::new()
                .name(format!("quickmatch worker {}", ctx.id))
                .spawn(move || worker_loop(ctx))
                .expect("spawning worker thread failed");
            WorkerHandle {
                events,
                failure,
                join: Some(join),
            }
        })
        .collect()
}

fn worker_loop(mut ctx: WorkerContext) {
    let mut matcher = Matcher::default();
    let mut local: Vec<Match> = Vec::new();
    let mut merge_scratch: Vec<Match> = Vec::new();
    let mut last_items_tick = 0u64;
    let mut last_query_tick = 0u64;

    log::trace!("worker {} started", ctx.id);

    'outer: loop {
        let flags = ctx.events.wait();
        if flags & STOP != 0 {
            log::trace!("worker {} stopping", ctx.id);
            break;
        }
        if flags & JOB == 0 {
            continue;
        }

        loop {
            let job = { ctx.job.lock().clone() };
            if job.items_tick == last_items_tick && job.query_tick == last_query_tick {
                // Superseded by a newer JOB already observed by a peer
                // before we got to it; nothing to do this round.
                continue 'outer;
            }

            if job.query.is_none() {
                // Empty-query fast path: report items in arena order,
                // no scoring needed.
                let out = ctx.output.write_buffer();
                out.matches.clear();
                out.query = None;
                out.items_tick = job.items_tick;
                out.query_tick = job.query_tick;
                ctx.output.commit();
                last_items_tick = job.items_tick;
                last_query_tick = job.query_tick;
                if !publish(&mut ctx) {
                    continue 'outer;
                }
                break;
            }

            let needle = job.query.clone().unwrap();
            local.clear();
            let mut scored_since_check = 0usize;
            let mut superseded = false;
            while let Some(range) = job.reserve_chunk(ctx.config.chunk_size) {
                for idx in range {
                    let haystack = job.items.at(idx);
                    if matcher.is_match(&needle, haystack).is_some() {
                        let score = matcher.score(&needle, haystack);
                        local.push(Match::new(idx as u32, score));
                    }
                    scored_since_check += 1;
                    if scored_since_check >= ctx.config.check_interval {
                        scored_since_check = 0;
                        let peek = ctx.events.get();
                        if peek & STOP != 0 {
                            return;
                        }
                        if peek & JOB != 0 {
                            let current = ctx.job.lock();
                            if current.items_tick != job.items_tick
                                || current.query_tick != job.query_tick
                            {
                                superseded = true;
                                break;
                            }
                        }
                    }
                }
                if superseded {
                    break;
                }
            }
            if superseded {
                continue;
            }

            local.sort_unstable();

            match merge_children(&mut ctx, &job, &mut local, &mut merge_scratch) {
                MergeOutcome::Done => {}
                MergeOutcome::Superseded => continue,
                MergeOutcome::ChildFailed => {
                    log::warn!("worker {} aborting: a descendant worker failed", ctx.id);
                    ctx.failure.record("a descendant worker failed during merge");
                    if let Some(callback) = &ctx.callback {
                        callback();
                    }
                    return;
                }
                MergeOutcome::Stop => {
                    log::trace!("worker {} stopping mid-merge", ctx.id);
                    break 'outer;
                }
            }

            let out = ctx.output.write_buffer();
            out.matches.clear();
            out.matches.extend_from_slice(&local);
            out.query = job.query.clone();
            out.items_tick = job.items_tick;
            out.query_tick = job.query_tick;
            ctx.output.commit();
            last_items_tick = job.items_tick;
            last_query_tick = job.query_tick;
            log::trace!(
                "worker {} published {} matches (items_tick={}, query_tick={})",
                ctx.id,
                local.len(),
                job.items_tick,
                job.query_tick
            );

            if !publish(&mut ctx) {
                continue;
            }
            if ctx.id == 0 {
                log::debug!("merge tree completed at worker 0");
            }
            break;
        }
    }
}

enum MergeOutcome {
    Done,
    /// A newer job superseded this one mid-merge; restart from the top
    /// of the state machine.
    Superseded,
    /// A descendant worker hit a terminal failure; the aggregate error
    /// propagates up to worker 0 rather than merging forever.
    ChildFailed,
    /// STOP was posted while waiting on a child; unwind to the engine's
    /// shutdown path instead of merging forever.
    Stop,
}

/// Merges every child's matching-tick output into `local`.
///
/// Blocks on `ctx.events` between passes rather than spinning: a child
/// posts MERGE to its parent from [`publish`] as soon as its own commit
/// lands, which wakes this wait immediately if the child finishes after
/// we've already started waiting, and returns without blocking at all if
/// it finished before we asked (the flag is already set). STOP is checked
/// on every wakeup so Merging is preemptible, matching the Scoring loop's
/// own check.
fn merge_children(
    ctx: &mut WorkerContext,
    job: &Job,
    local: &mut Vec<Match>,
    scratch: &mut Vec<Match>,
) -> MergeOutcome {
    let mut done = vec![false; ctx.children.len()];
    loop {
        for i in 0..ctx.children.len() {
            if done[i] {
                continue;
            }
            if ctx.children_failures[i].is_failed() {
                return MergeOutcome::ChildFailed;
            }
            let child = &mut ctx.children[i];
            child.load();
            let results = child.read_buffer();
            if results.items_tick > job.items_tick || results.query_tick > job.query_tick {
                return MergeOutcome::Superseded;
            }
            if results.items_tick < job.items_tick || results.query_tick < job.query_tick {
                continue;
            }
            Results::merge_sorted_into(local, &results.matches, scratch);
            std::mem::swap(local, scratch);
            done[i] = true;
        }
        if done.iter().all(|&d| d) {
            return MergeOutcome::Done;
        }
        let flags = ctx.events.wait();
        if flags & STOP != 0 {
            return MergeOutcome::Stop;
        }
    }
}

/// Notifies whoever is downstream of this worker's commit: the parent's
/// Events in the merge tree, or the external callback at worker 0.
/// Returns `false` if the worker's own failure flag got set concurrently
/// (shouldn't happen absent an allocation failure, but keeps the caller
/// from looping forever on a dead worker).
fn publish(ctx: &mut WorkerContext) -> bool {
    if ctx.failure.is_failed() {
        return false;
    }
    if let Some(parent) = &ctx.parent_events {
        parent.post(MERGE);
    }
    if let Some(callback) = &ctx.callback {
        callback();
    }
    true
}
