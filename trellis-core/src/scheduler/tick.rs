//! Tick Driver
//!
//! A tick is the boundary at which deferred work runs. Callbacks queued with
//! [`next_tick`] run together, in FIFO order, the next time the host drains
//! the tick. Callbacks queued while a batch is draining wait for the next
//! batch, which mirrors how a microtask checkpoint behaves.
//!
//! Hosts drive ticks in one of two ways:
//!
//! - synchronously, by calling [`run_tick`] or [`run_until_idle`] from their
//!   own event loop;
//! - asynchronously, by awaiting [`tick`], which yields to the tokio
//!   executor once and then drains.

use std::cell::RefCell;

use tracing::trace;

use crate::reactive::Runtime;

type TickCallback = Box<dyn FnOnce()>;

#[derive(Default)]
struct TickState {
    callbacks: Vec<TickCallback>,
    pending: bool,
}

thread_local! {
    static TICKS: RefCell<TickState> = RefCell::new(TickState::default());
}

/// Defer `callback` to the next tick.
pub fn next_tick<F>(callback: F)
where
    F: FnOnce() + 'static,
{
    TICKS.with(|ticks| {
        let mut ticks = ticks.borrow_mut();
        ticks.callbacks.push(Box::new(callback));
        ticks.pending = true;
    });
}

/// Whether callbacks are waiting for a tick.
pub fn is_tick_pending() -> bool {
    TICKS.with(|ticks| ticks.borrow().pending)
}

/// Drain one batch of callbacks. Returns how many ran.
///
/// A callback that panics is reported and the rest of the batch still runs.
pub fn run_tick() -> usize {
    let batch = TICKS.with(|ticks| {
        let mut ticks = ticks.borrow_mut();
        ticks.pending = false;
        std::mem::take(&mut ticks.callbacks)
    });

    let count = batch.len();
    if count > 0 {
        trace!(callbacks = count, "running tick");
    }
    for callback in batch {
        Runtime::guard("next_tick callback", || {
            callback();
            Ok(())
        });
    }
    count
}

/// Drain batches until no tick is pending. Returns how many callbacks ran.
pub fn run_until_idle() -> usize {
    let mut total = 0;
    while is_tick_pending() {
        total += run_tick();
    }
    total
}

/// Yield to the executor once, then drain every pending tick.
///
/// Mutations made by other tasks before they yield are therefore coalesced
/// into the same flush.
pub async fn tick() {
    tokio::task::yield_now().await;
    run_until_idle();
}
