//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that a [`Dep`](super::Dep) can notify:
//! render watchers, computed values, and user watch expressions. The
//! scheduler and the dependency lists only ever see subscribers through the
//! [`Subscriber`] trait, which keeps them independent of a watcher's value
//! type.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dep;
use crate::error::Result;

/// Unique identifier for a subscriber.
///
/// IDs are handed out from a process-wide counter, so they also record
/// creation order: a watcher created by another watcher's evaluation always
/// has the larger ID. The scheduler relies on this to flush parents first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
    /// Generate a new unique watcher ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for WatcherId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A computation that can be subscribed to dependencies and re-run.
pub trait Subscriber {
    /// The subscriber's ID.
    fn id(&self) -> WatcherId;

    /// Human-readable label used in diagnostics.
    fn expression(&self) -> &str;

    /// Record that the running evaluation read `dep`.
    ///
    /// Only called while this subscriber is the active target.
    fn add_dep(&self, dep: &Rc<Dep>);

    /// React to a change notification from one of the subscribed deps.
    fn update(&self);

    /// Re-evaluate now. Called by the scheduler during a flush.
    fn run(&self) -> Result<()>;

    /// Hook invoked by the scheduler right before [`run`](Self::run).
    fn before(&self) {}

    /// Whether the subscriber is still live (not torn down).
    fn is_active(&self) -> bool;
}
