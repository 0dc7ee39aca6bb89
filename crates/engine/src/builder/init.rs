//! One-shot lazy initialization shared by every caller of a builder.
//!
//! State moves `NotStarted -> Started -> Done` under a single mutex. One
//! thread runs the initializer with the lock released; other threads wait on
//! a condvar until it publishes. A call from the initializing thread itself
//! (the host re-entering the builder while options are being resolved) gets
//! `None` and must treat the section as a pass-through.
//!
//! A failed initialization returns the source to `NotStarted` so a later call
//! can retry. A panicking initializer loses the source: the state becomes
//! `Poisoned`, waiters are woken, and every later call fails.

use std::sync::{Condvar, Mutex, MutexGuard, OnceLock};
use std::thread::{self, ThreadId};

use crate::error::{BuilderError, Result};
use crate::options::BuilderConfig;

/// Everything a builder needs after initialization.
#[derive(Debug)]
pub(crate) struct Ready<S> {
    pub(crate) config: BuilderConfig,
    pub(crate) source: S,
}

enum State<S> {
    NotStarted(S),
    Started(ThreadId),
    Done,
    Poisoned,
}

pub(crate) struct LazyInit<S> {
    state: Mutex<State<S>>,
    finished: Condvar,
    ready: OnceLock<Ready<S>>,
}

impl<S> LazyInit<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            state: Mutex::new(State::NotStarted(source)),
            finished: Condvar::new(),
            ready: OnceLock::new(),
        }
    }

    /// The published state, without triggering initialization.
    pub(crate) fn get(&self) -> Option<&Ready<S>> {
        self.ready.get()
    }

    /// Run `init` once and publish its result.
    ///
    /// Returns `Ok(None)` for a re-entrant call from the initializing thread.
    pub(crate) fn get_or_init<F>(&self, init: F) -> Result<Option<&Ready<S>>>
    where
        F: FnOnce(&mut S) -> Result<BuilderConfig>,
    {
        if let Some(ready) = self.ready.get() {
            return Ok(Some(ready));
        }

        let me = thread::current().id();
        let mut state = self.lock();
        let mut source = loop {
            match std::mem::replace(&mut *state, State::Started(me)) {
                State::NotStarted(source) => break source,
                State::Done => {
                    *state = State::Done;
                    return Ok(self.ready.get());
                }
                State::Poisoned => {
                    *state = State::Poisoned;
                    return Err(BuilderError::Poisoned);
                }
                State::Started(owner) => {
                    *state = State::Started(owner);
                    if owner == me {
                        return Ok(None);
                    }
                    state = self
                        .finished
                        .wait(state)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        };
        drop(state);

        let mut unwinding = PoisonOnUnwind { lazy: self, armed: true };
        let outcome = init(&mut source);
        unwinding.armed = false;

        let mut state = self.lock();
        let result = match outcome {
            Ok(config) => {
                // Publish before flipping to Done so waiters always find it.
                let _ = self.ready.set(Ready { config, source });
                *state = State::Done;
                Ok(self.ready.get())
            }
            Err(error) => {
                *state = State::NotStarted(source);
                Err(error)
            }
        };
        drop(state);
        self.finished.notify_all();
        result
    }

    fn lock(&self) -> MutexGuard<'_, State<S>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Marks the state `Poisoned` and wakes waiters if the initializer unwinds.
struct PoisonOnUnwind<'a, S> {
    lazy: &'a LazyInit<S>,
    armed: bool,
}

impl<S> Drop for PoisonOnUnwind<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            *self.lazy.lock() = State::Poisoned;
            self.lazy.finished.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    #[test]
    fn test_runs_once_under_contention() {
        let lazy = Arc::new(LazyInit::new(0u32));
        let runs = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lazy = Arc::clone(&lazy);
                let runs = Arc::clone(&runs);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let ready = lazy
                        .get_or_init(|source| {
                            runs.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            *source = 7;
                            Ok(BuilderConfig::default())
                        })
                        .unwrap()
                        .expect("non-initializing threads wait for the result");
                    ready.source
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_call_gets_none() {
        let lazy = LazyInit::new(());
        let ready = lazy
            .get_or_init(|_| {
                let inner = lazy.get_or_init(|_| Ok(BuilderConfig::default())).unwrap();
                assert!(inner.is_none());
                Ok(BuilderConfig::default())
            })
            .unwrap();
        assert!(ready.is_some());
    }

    #[test]
    fn test_failure_allows_retry() {
        let lazy = LazyInit::new(());
        let err = lazy.get_or_init(|_| Err(BuilderError::MissingOption("path".into())));
        assert!(err.is_err());
        assert!(lazy.get().is_none());

        let ready = lazy.get_or_init(|_| Ok(BuilderConfig::default())).unwrap();
        assert!(ready.is_some());
    }

    #[test]
    fn test_panic_wakes_waiters_and_poisons() {
        let lazy = Arc::new(LazyInit::new(()));
        let started = Arc::new(Barrier::new(2));

        let initializer = {
            let lazy = Arc::clone(&lazy);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                let _ = lazy.get_or_init(|_| {
                    started.wait();
                    thread::sleep(Duration::from_millis(50));
                    panic!("source blew up");
                });
            })
        };
        started.wait();
        let waiter = {
            let lazy = Arc::clone(&lazy);
            thread::spawn(move || {
                matches!(
                    lazy.get_or_init(|_| Ok(BuilderConfig::default())),
                    Err(BuilderError::Poisoned)
                )
            })
        };

        assert!(initializer.join().is_err());
        assert!(waiter.join().unwrap());
        assert!(matches!(
            lazy.get_or_init(|_| Ok(BuilderConfig::default())),
            Err(BuilderError::Poisoned)
        ));
        assert!(lazy.get().is_none());
    }
}
