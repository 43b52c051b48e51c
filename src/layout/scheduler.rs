//! Serialized update queue
//!
//! Every mutation is queued first and applied by whichever caller holds the
//! state lock, together with anything other callers queued meanwhile. Each
//! submission carries its own completion, so a caller sees the outcome of
//! its own events and never an error raised by somebody else's.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::debug;

/// Outcome slot of one submission
#[derive(Debug)]
struct Completion<Err> {
    result: Mutex<Option<Result<(), Err>>>,
    ready: Condvar,
}

impl<Err> Completion<Err> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, result: Result<(), Err>) {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(result);
        self.ready.notify_all();
    }

    /// Block until the submission has been applied
    fn wait(&self) -> Result<(), Err> {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = slot.take() {
                return result;
            }
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Events queued together by one caller
#[derive(Debug)]
struct Submission<E, Err> {
    events: Vec<E>,
    completion: Arc<Completion<Err>>,
}

#[derive(Debug)]
pub struct UpdateScheduler<S, E, Err> {
    queue: Mutex<VecDeque<Submission<E, Err>>>,
    state: Mutex<S>,
}

impl<S, E, Err> UpdateScheduler<S, E, Err> {
    pub fn new(state: S) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            state: Mutex::new(state),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Submission<E, Err>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    /// Queue `events` as one submission, apply the queue under the state
    /// lock and return the first error raised by these events.
    ///
    /// Later events of a submission still run after an earlier one fails.
    /// If another caller holds the lock this blocks until it is released;
    /// by then the holder may already have applied this submission. `finish`
    /// runs once, under the lock, if anything was applied. `apply` and
    /// `finish` must not submit to this scheduler themselves.
    pub fn submit(
        &self,
        events: Vec<E>,
        mut apply: impl FnMut(&mut S, E) -> Result<(), Err>,
        finish: impl FnOnce(&mut S),
    ) -> Result<(), Err> {
        let completion = Arc::new(Completion::new());
        self.queue().push_back(Submission {
            events,
            completion: Arc::clone(&completion),
        });

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut applied = 0usize;
        // pop in its own statement so the queue lock is not held by apply
        loop {
            let next = self.queue().pop_front();
            let Some(submission) = next else { break };
            applied += 1;
            let mut first_error = None;
            for event in submission.events {
                if let Err(err) = apply(&mut state, event) {
                    first_error.get_or_insert(err);
                }
            }
            submission.completion.complete(match first_error {
                Some(err) => Err(err),
                None => Ok(()),
            });
        }
        if applied > 0 {
            debug!(submissions = applied; "drained update queue");
            finish(&mut state);
        }
        drop(state);

        completion.wait()
    }

    /// Run `f` with exclusive access to the state, blocking until available
    pub fn with_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    fn record(log: &mut Vec<i32>, event: i32) -> Result<(), i32> {
        if event < 0 {
            return Err(event);
        }
        log.push(event);
        Ok(())
    }

    #[test]
    fn test_submit_applies_in_order_and_finishes_once() {
        let scheduler = UpdateScheduler::new(Vec::new());
        let mut finished = 0;
        scheduler
            .submit(vec![1, 2, 3], record, |_| finished += 1)
            .unwrap();
        assert_eq!(finished, 1);
        assert_eq!(scheduler.with_state(|log| log.clone()), vec![1, 2, 3]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_errors_do_not_stop_the_submission() {
        let scheduler = UpdateScheduler::new(Vec::new());
        let result = scheduler.submit(vec![1, -1, 2, -2], record, |_| {});
        assert_eq!(result, Err(-1));
        assert_eq!(scheduler.with_state(|log| log.clone()), vec![1, 2]);
    }

    #[test]
    fn test_empty_submission_still_completes() {
        let scheduler = UpdateScheduler::new(Vec::new());
        assert_eq!(scheduler.submit(Vec::new(), record, |_| {}), Ok(()));
    }

    #[test]
    fn test_waiting_caller_gets_its_own_error() {
        let scheduler = UpdateScheduler::new(Vec::new());
        let started = Barrier::new(2);

        thread::scope(|scope| {
            // hold the state lock so the second caller has to queue and wait
            let holder = scope.spawn(|| {
                scheduler.with_state(|_| {
                    started.wait();
                    while scheduler.pending() == 0 {
                        thread::yield_now();
                    }
                });
                scheduler.submit(vec![1], record, |_| {})
            });
            started.wait();
            let waiter = scheduler.submit(vec![-7], record, |_| {});

            assert_eq!(waiter, Err(-7));
            assert_eq!(holder.join().unwrap(), Ok(()));
        });
        assert_eq!(scheduler.with_state(|log| log.clone()), vec![1]);
    }

    #[test]
    fn test_concurrent_submitters_lose_nothing() {
        let scheduler = UpdateScheduler::new(0usize);
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        scheduler
                            .submit(
                                vec![1usize],
                                |count: &mut usize, n| -> Result<(), ()> {
                                    *count += n;
                                    Ok(())
                                },
                                |_| {},
                            )
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(scheduler.with_state(|count| *count), 800);
    }
}
