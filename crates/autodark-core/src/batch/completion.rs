use std::sync::{Condvar, Mutex, PoisonError};

type Callback = Box<dyn FnOnce() + Send>;

struct LatchState {
    remaining: usize,
    on_complete: Option<Callback>,
}

/// Counts finished files and fires a callback when the last one is done.
///
/// The decrement and the zero check share one critical section, so the
/// callback runs exactly once no matter how completions interleave.
pub struct CompletionLatch {
    state: Mutex<LatchState>,
    done: Condvar,
}

impl CompletionLatch {
    pub fn new(total: usize, on_complete: impl FnOnce() + Send + 'static) -> Self {
        Self {
            state: Mutex::new(LatchState {
                remaining: total,
                on_complete: Some(Box::new(on_complete)),
            }),
            done: Condvar::new(),
        }
    }

    /// Record one finished file. Returns true for the call that reached zero.
    pub fn count_down(&self) -> bool {
        let callback = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.remaining == 0 {
                return false;
            }
            state.remaining -= 1;
            if state.remaining > 0 {
                return false;
            }
            state.on_complete.take()
        };

        if let Some(callback) = callback {
            callback();
        }
        self.done.notify_all();
        true
    }

    pub fn remaining(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remaining
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while state.remaining > 0 {
            state = self.done.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fires_exactly_once_under_contention() {
        for _ in 0..20 {
            let fired = Arc::new(AtomicUsize::new(0));
            let fired_cb = Arc::clone(&fired);
            let latch = Arc::new(CompletionLatch::new(64, move || {
                fired_cb.fetch_add(1, Ordering::SeqCst);
            }));
            let zero_hits = Arc::new(AtomicUsize::new(0));

            let threads: Vec<_> = (0..64)
                .map(|_| {
                    let latch = Arc::clone(&latch);
                    let zero_hits = Arc::clone(&zero_hits);
                    std::thread::spawn(move || {
                        if latch.count_down() {
                            zero_hits.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for t in threads {
                t.join().unwrap();
            }

            assert_eq!(fired.load(Ordering::SeqCst), 1);
            assert_eq!(zero_hits.load(Ordering::SeqCst), 1);
            assert_eq!(latch.remaining(), 0);
        }
    }

    #[test]
    fn test_extra_count_down_is_ignored() {
        let latch = CompletionLatch::new(1, || {});
        assert!(latch.count_down());
        assert!(!latch.count_down());
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn test_wait_returns_after_last() {
        let latch = Arc::new(CompletionLatch::new(2, || {}));
        let worker = {
            let latch = Arc::clone(&latch);
            std::thread::spawn(move || {
                latch.count_down();
                latch.count_down();
            })
        };
        latch.wait();
        worker.join().unwrap();
        assert_eq!(latch.remaining(), 0);
    }
}
