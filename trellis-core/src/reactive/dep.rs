//! Dependency Implementation
//!
//! A [`Dep`] is the publisher half of the reactive system: one per observed
//! property cell, plus one per observed container for structural changes.
//!
//! # How Deps Work
//!
//! 1. When a cell is read, it calls [`Dep::depend`]. If a watcher is
//!    evaluating, that watcher decides whether to subscribe.
//!
//! 2. When a cell is written, it calls [`Dep::notify`], which asks every
//!    subscriber to update.
//!
//! # Ownership
//!
//! A dep owns its subscriber list, never the subscribers. Entries are weak
//! references, so a dep never keeps a dropped watcher alive; dead entries are
//! skipped on notification and pruned lazily.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, WatcherId};

/// Unique identifier for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    /// Generate a new unique dep ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for DepId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscription {
    id: WatcherId,
    subscriber: Weak<dyn Subscriber>,
}

/// A publisher of change notifications.
pub struct Dep {
    id: DepId,
    subs: RefCell<Vec<Subscription>>,
}

impl Dep {
    /// Create a new dep with no subscribers.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: DepId::new(),
            subs: RefCell::new(Vec::new()),
        })
    }

    /// Get the dep's unique ID.
    pub fn id(&self) -> DepId {
        self.id
    }

    /// Append a subscriber.
    ///
    /// Duplicate suppression is the caller's job: a watcher only subscribes
    /// to deps it did not already hold in its previous evaluation.
    pub fn add_sub(&self, id: WatcherId, subscriber: Weak<dyn Subscriber>) {
        self.subs.borrow_mut().push(Subscription { id, subscriber });
    }

    /// Remove a subscriber by identity.
    pub fn remove_sub(&self, id: WatcherId) {
        let mut subs = self.subs.borrow_mut();
        if let Some(pos) = subs.iter().position(|sub| sub.id == id) {
            subs.remove(pos);
        }
    }

    /// Register this dep with the active watcher, if any.
    pub fn depend(self: &Rc<Self>) {
        if let Some(target) = ReactiveContext::current_target() {
            target.add_dep(self);
        }
    }

    /// Ask every subscriber to update.
    ///
    /// Iterates over a snapshot taken before the first update, in
    /// subscription order. Subscribers added or removed by an update take
    /// effect on the next notification.
    pub fn notify(&self) {
        let snapshot: Vec<Rc<dyn Subscriber>> = {
            let mut subs = self.subs.borrow_mut();
            subs.retain(|sub| sub.subscriber.strong_count() > 0);
            subs.iter().filter_map(|sub| sub.subscriber.upgrade()).collect()
        };

        for subscriber in snapshot {
            subscriber.update();
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs
            .borrow()
            .iter()
            .filter(|sub| sub.subscriber.strong_count() > 0)
            .count()
    }

    /// IDs of the subscribers, in subscription order.
    pub fn subscriber_ids(&self) -> Vec<WatcherId> {
        self.subs.borrow().iter().map(|sub| sub.id).collect()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscribers", &self.subscriber_ids())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
