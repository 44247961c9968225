//! Condvar-backed multi-flag wait/post/get primitive.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Condvar, Mutex};

const WAIT_FLAG: u32 = 0x8000_0000;
const EVENT_MASK: u32 = !WAIT_FLAG;

/// A set of 31 coalescable event flags plus one reserved "sleeping" bit.
///
/// Any number of flags can be posted between two `wait`/`get` calls; the
/// consumer sees them OR'd together rather than one notification per post,
/// so a burst of posts while the consumer is busy costs one wakeup, not N.
#[derive(Default)]
pub struct Events {
    state: AtomicU32,
    mutex: Mutex<()>,
    cv: Condvar,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polls and clears the current flags without blocking.
    pub fn get(&self) -> u32 {
        self.state.swap(0, Ordering::AcqRel)
    }

    /// Blocks the calling thread until at least one flag is posted, then
    /// clears and returns the accumulated flags.
    pub fn wait(&self) -> u32 {
        let mut guard = self.mutex.lock();
        if self.state.fetch_or(WAIT_FLAG, Ordering::AcqRel) & EVENT_MASK == 0 {
            while self.state.load(Ordering::Acquire) & EVENT_MASK == 0 {
                self.cv.wait(&mut guard);
            }
        }
        self.state.swap(0, Ordering::AcqRel) & EVENT_MASK
    }

    /// Posts `flags` from another thread, waking a sleeping waiter if any.
    ///
    /// # Panics
    /// Panics (debug only) if `flags` sets the reserved sleeping bit or is
    /// zero.
    pub fn post(&self, flags: u32) {
        debug_assert_eq!(flags & WAIT_FLAG, 0, "flags must not set the reserved bit");
        debug_assert_ne!(flags, 0, "post() with no flags set is a no-op bug");
        if self.state.fetch_or(flags, Ordering::AcqRel) != WAIT_FLAG {
            return;
        }
        let _guard = self.mutex.lock();
        self.cv.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn get_without_post_is_zero() {
        let events = Events::new();
        assert_eq!(events.get(), 0);
    }

    #[test]
    fn get_clears_posted_flags() {
        let events = Events::new();
        events.post(0b101);
        assert_eq!(events.get(), 0b101);
        assert_eq!(events.get(), 0);
    }

    #[test]
    fn multiple_posts_coalesce() {
        let events = Events::new();
        events.post(0b001);
        events.post(0b010);
        events.post(0b100);
        assert_eq!(events.get(), 0b111);
    }

    #[test]
    fn wait_wakes_on_post_from_another_thread() {
        let events = Arc::new(Events::new());
        let waiter = events.clone();
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(20));
        events.post(0b1);
        let flags = handle.join().unwrap();
        assert_eq!(flags, 0b1);
    }

    #[test]
    fn wait_returns_immediately_if_already_posted() {
        let events = Events::new();
        events.post(0b10);
        assert_eq!(events.wait(), 0b10);
    }
}
