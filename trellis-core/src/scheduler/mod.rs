//! Update Scheduler
//!
//! Watchers do not re-run the moment a dependency changes. They mark
//! themselves dirty and join a queue, and the queue is flushed once per tick.
//! Any number of synchronous mutations therefore cost one run per distinct
//! dirty watcher.
//!
//! - the flush queue ([`queue_watcher`], [`flush_scheduler_queue`]):
//!   deduplicating and ordered by watcher ID;
//! - the tick driver ([`next_tick`], [`run_tick`], [`tick`]): the
//!   deferred-callback boundary the flush is scheduled on.

mod queue;
mod tick;

pub use queue::{
    dequeue, flush_scheduler_queue, is_flush_pending, is_flushing, is_queued, queue_watcher,
    queued_ids,
};
pub use tick::{is_tick_pending, next_tick, run_tick, run_until_idle, tick};
