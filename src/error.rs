use thiserror::Error;

/// Errors surfaced by [`crate::Engine`] and its building blocks.
///
/// Per-item allocation failures inside a worker thread are *not* reported
/// here: they're recorded in a fixed-size buffer on the worker itself and
/// surfaced through [`crate::Engine::worker_failure`], since propagating
/// them through the query pipeline would require blocking the producer on
/// a potentially wedged worker.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A haystack was pushed that is larger than the matcher's configured
    /// [`quickmatch_matcher::MATCH_MAX_LEN`](quickmatch_matcher::MATCH_MAX_LEN) bound.
    #[error("item of {len} bytes exceeds the maximum haystack length of {max}")]
    ItemTooLarge { len: usize, max: usize },

    /// The item arena has reached its maximum representable index.
    #[error("item store is at capacity ({0} items)")]
    Capacity(usize),

    /// An operation was attempted while the engine was not in a state that
    /// permits it (e.g. calling [`crate::Engine::start`] twice, or changing
    /// the worker thread count while running).
    #[error("engine is not in a state that permits this operation: {0}")]
    InvalidState(&'static str),
}
