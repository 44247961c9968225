//! Single-producer, single-consumer, wait-free "latest value" channel.
//!
//! Unlike the single-threaded sketch this started as, workers actually hand
//! their output across threads: one worker commits, a parent worker (or the
//! consumer, for worker 0) loads. [`value_tx`] returns a writer/reader pair
//! sharing one allocation; each side only ever touches its own buffer index,
//! and the shared `unused` atomic is the sole synchronization point, exactly
//! as in the single-struct version, just split so the two halves can live on
//! different threads without a lock.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

struct Shared<T> {
    buffers: [UnsafeCell<T>; 3],
    ticks: [AtomicUsize; 3],
    unused: AtomicU8,
}

// Safety: `buffers[write]` is touched only by `TxWriter`, `buffers[read]`
// only by `TxReader`; the triple-buffer protocol guarantees `write` and
// `read` never name the same slot at the same time, so there's no data race
// even though both handles share the allocation.
unsafe impl<T: Send> Sync for Shared<T> {}

/// Write side of a [`value_tx`] channel. Exclusive to the committing thread.
pub struct TxWriter<T> {
    shared: Arc<Shared<T>>,
    write: u8,
}

/// Read side of a [`value_tx`] channel. Exclusive to the loading thread.
pub struct TxReader<T> {
    shared: Arc<Shared<T>>,
    read: u8,
}

/// Builds a fresh triple-buffered channel seeded with `init`.
pub fn value_tx<T: Clone>(init: T) -> (TxWriter<T>, TxReader<T>) {
    let shared = Arc::new(Shared {
        buffers: [
            UnsafeCell::new(init.clone()),
            UnsafeCell::new(init.clone()),
            UnsafeCell::new(init),
        ],
        ticks: [AtomicUsize::new(0), AtomicUsize::new(0), AtomicUsize::new(0)],
        unused: AtomicU8::new(2),
    });
    (
        TxWriter {
            shared: shared.clone(),
            write: 0,
        },
        TxReader { shared, read: 1 },
    )
}

impl<T> TxWriter<T> {
    /// The buffer to fill in before calling [`Self::commit`].
    ///
    /// The returned reference is only valid up to the next `commit` call.
    pub fn write_buffer(&mut self) -> &mut T {
        // Safety: exclusive to this writer; never aliases the reader's slot.
        unsafe { &mut *self.shared.buffers[self.write as usize].get() }
    }

    /// Publishes the contents of [`Self::write_buffer`] and obtains a new
    /// (possibly stale, overwrite it fully) one.
    pub fn commit(&mut self) {
        let tick = self.shared.ticks[self.write as usize].load(Ordering::Relaxed) + 1;
        self.shared.ticks[self.write as usize].store(tick, Ordering::Relaxed);
        self.write = self.shared.unused.swap(self.write, Ordering::AcqRel);
        self.shared.ticks[self.write as usize].store(tick, Ordering::Relaxed);
    }

    pub fn write_tick(&self) -> usize {
        self.shared.ticks[self.write as usize].load(Ordering::Relaxed)
    }
}

impl<T> TxReader<T> {
    /// The most recently loaded buffer.
    ///
    /// The returned reference is only valid up to the next `load` call.
    pub fn read_buffer(&self) -> &T {
        // Safety: exclusive to this reader; never aliases the writer's slot.
        unsafe { &*self.shared.buffers[self.read as usize].get() }
    }

    /// Picks up the newest committed value, if there is one newer than
    /// what's already in [`Self::read_buffer`].
    ///
    /// Returns `true` if a new value was picked up.
    pub fn load(&mut self) -> bool {
        let tick = self.shared.ticks[self.read as usize].load(Ordering::Relaxed);
        self.read = self.shared.unused.swap(self.read, Ordering::AcqRel);
        if self.shared.ticks[self.read as usize].load(Ordering::Relaxed) > tick {
            return true;
        }
        self.read = self.shared.unused.swap(self.read, Ordering::AcqRel);
        self.shared.ticks[self.read as usize].load(Ordering::Relaxed) > tick
    }

    pub fn read_tick(&self) -> usize {
        self.shared.ticks[self.read as usize].load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_picks_up_committed_value() {
        let (mut w, mut r) = value_tx(0u32);
        *w.write_buffer() = 42;
        w.commit();
        assert!(r.load());
        assert_eq!(*r.read_buffer(), 42);
    }

    #[test]
    fn load_is_false_without_a_new_commit() {
        let (mut w, mut r) = value_tx(0u32);
        *w.write_buffer() = 1;
        w.commit();
        assert!(r.load());
        assert!(!r.load());
        assert_eq!(*r.read_buffer(), 1);
    }

    #[test]
    fn repeated_commits_without_load_only_surface_the_latest() {
        let (mut w, mut r) = value_tx(0u32);
        for v in 1..=5u32 {
            *w.write_buffer() = v;
            w.commit();
        }
        assert!(r.load());
        assert_eq!(*r.read_buffer(), 5);
    }

    #[test]
    fn ticks_advance_monotonically_per_slot() {
        let (mut w, mut r) = value_tx(0u32);
        assert_eq!(w.write_tick(), 0);
        w.commit();
        assert_eq!(w.write_tick(), 0);
        r.load();
        assert_eq!(r.read_tick(), 1);
    }

    #[test]
    fn commits_and_loads_across_real_threads() {
        use std::thread;
        use std::time::Duration;

        let (mut w, mut r) = value_tx(0u32);
        let handle = thread::spawn(move || {
            for v in 1..=100u32 {
                *w.write_buffer() = v;
                w.commit();
                thread::sleep(Duration::from_micros(50));
            }
        });
        let mut last_seen = 0u32;
        while last_seen < 100 {
            if r.load() {
                last_seen = *r.read_buffer();
            }
        }
        handle.join().unwrap();
        assert_eq!(last_seen, 100);
    }
}
