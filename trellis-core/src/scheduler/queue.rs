//! Watcher Flush Queue
//!
//! Dirty watchers are collected here and re-run together on the next tick.
//!
//! # Algorithm
//!
//! 1. `queue_watcher` ignores a watcher that is already queued, so any number
//!    of notifications in one synchronous burst cost one run.
//! 2. The first enqueue of a burst schedules exactly one flush.
//! 3. The flush sorts the queue by watcher ID (creation order), so parents
//!    run before the children they created, then walks it with a live
//!    cursor. Watchers queued during the flush are inserted by ID after the
//!    cursor and still run in the same flush.
//! 4. A watcher's `has` entry is cleared right before it runs, so a watcher
//!    that re-triggers itself is queued again instead of being dropped. The
//!    number of such re-runs is bounded by `Config::max_update_count`.
//! 5. Failures are reported per watcher and the flush moves on. A watcher
//!    whose `before` hook fails is skipped for this flush. The queue is
//!    reset however the flush ends.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use super::tick::next_tick;
use crate::config::FlushMode;
use crate::error::ReactiveError;
use crate::reactive::{Runtime, Subscriber, WatcherId};

#[derive(Clone)]
struct QueueEntry {
    id: WatcherId,
    subscriber: Weak<dyn Subscriber>,
}

#[derive(Default)]
struct SchedulerState {
    queue: Vec<QueueEntry>,
    has: HashSet<WatcherId>,
    circular: HashMap<WatcherId, usize>,
    /// A flush is scheduled or running.
    waiting: bool,
    flushing: bool,
    index: usize,
}

thread_local! {
    static SCHEDULER: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

/// Queue `subscriber` for the next flush, once.
pub fn queue_watcher(subscriber: &Rc<dyn Subscriber>) {
    let id = subscriber.id();

    let flush_now = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        if !state.has.insert(id) {
            return None;
        }

        let entry = QueueEntry {
            id,
            subscriber: Rc::downgrade(subscriber),
        };

        if !state.flushing {
            state.queue.push(entry);
        } else {
            // Keep the unprocessed tail sorted, and never land on or before
            // the cursor: the entry there has already been taken.
            let mut pos = state.queue.len();
            while pos > 0 && state.queue[pos - 1].id > id {
                pos -= 1;
            }
            let pos = pos.max(state.index + 1).min(state.queue.len());
            state.queue.insert(pos, entry);
        }

        if state.waiting {
            return None;
        }
        state.waiting = true;
        Some(Runtime::config().flush_mode == FlushMode::Sync)
    });

    match flush_now {
        Some(true) => flush_scheduler_queue(),
        Some(false) => next_tick(flush_scheduler_queue),
        None => {}
    }
}

/// Drop a torn-down watcher that has not run yet in the current cycle.
pub fn dequeue(id: WatcherId) {
    let _ = SCHEDULER.try_with(|state| {
        let Ok(mut state) = state.try_borrow_mut() else {
            return;
        };
        if !state.has.remove(&id) {
            return;
        }

        let start = if state.flushing { state.index + 1 } else { 0 };
        let start = start.min(state.queue.len());
        if let Some(offset) = state.queue[start..].iter().position(|entry| entry.id == id) {
            state.queue.remove(start + offset);
        }
    });
}

/// Whether `id` is waiting in the queue.
pub fn is_queued(id: WatcherId) -> bool {
    SCHEDULER.with(|state| state.borrow().has.contains(&id))
}

/// IDs currently in the queue, in queue order.
pub fn queued_ids() -> Vec<WatcherId> {
    SCHEDULER.with(|state| state.borrow().queue.iter().map(|entry| entry.id).collect())
}

/// Whether a flush is scheduled or running.
pub fn is_flush_pending() -> bool {
    SCHEDULER.with(|state| state.borrow().waiting)
}

/// Whether a flush is running right now.
pub fn is_flushing() -> bool {
    SCHEDULER.with(|state| state.borrow().flushing)
}

/// Run every queued watcher in ascending ID order.
pub fn flush_scheduler_queue() {
    let limit = Runtime::config().max_update_count;

    let queued = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        state.flushing = true;
        state.index = 0;
        state.queue.sort_by_key(|entry| entry.id);
        state.queue.len()
    });
    trace!(queued, "flushing scheduler queue");

    // Resets the queue however the flush ends, so a later write can always
    // schedule a new one.
    let _reset = ResetOnExit;

    let mut ran = 0usize;
    loop {
        let entry = SCHEDULER.with(|state| {
            let state = state.borrow();
            state.queue.get(state.index).cloned()
        });
        let Some(entry) = entry else {
            break;
        };

        let live = entry.subscriber.upgrade().filter(|subscriber| subscriber.is_active());
        if let Some(subscriber) = live {
            let expression = subscriber.expression();
            let ready = Runtime::guard(expression, || {
                subscriber.before();
                Ok(())
            });
            SCHEDULER.with(|state| state.borrow_mut().has.remove(&entry.id));
            if !ready {
                SCHEDULER.with(|state| state.borrow_mut().index += 1);
                continue;
            }
            Runtime::guard(expression, || subscriber.run());
            ran += 1;

            let looping = SCHEDULER.with(|state| {
                let mut state = state.borrow_mut();
                if !state.has.contains(&entry.id) {
                    return false;
                }
                let count = state.circular.entry(entry.id).or_insert(0);
                *count += 1;
                *count > limit
            });
            if looping {
                let err = ReactiveError::InfiniteUpdateLoop {
                    expression: subscriber.expression().to_string(),
                    limit,
                };
                warn!(watcher = %entry.id, limit, "aborting flush: watcher keeps re-queueing itself");
                Runtime::report_error(&err, subscriber.expression());
                break;
            }
        } else {
            SCHEDULER.with(|state| state.borrow_mut().has.remove(&entry.id));
        }

        SCHEDULER.with(|state| state.borrow_mut().index += 1);
    }

    debug!(ran, "scheduler flush complete");
}

struct ResetOnExit;

impl Drop for ResetOnExit {
    fn drop(&mut self) {
        reset_scheduler_state();
    }
}

fn reset_scheduler_state() {
    let _ = SCHEDULER.try_with(|state| {
        let Ok(mut state) = state.try_borrow_mut() else {
            return;
        };
        state.queue.clear();
        state.has.clear();
        state.circular.clear();
        state.waiting = false;
        state.flushing = false;
        state.index = 0;
    });
}
