//! Reactive Primitives
//!
//! This module implements dependency tracking: deps, watchers, computed
//! values and the user watch API. Together with [`crate::observer`], which
//! makes plain data reactive, they form the core of Trellis.
//!
//! # Concepts
//!
//! ## Deps
//!
//! A [`Dep`] is a publisher. Every reactive property owns one, and every
//! observed container owns one more for structural changes (keys added or
//! removed, array mutations).
//!
//! ## Watchers
//!
//! A [`Watcher`] is a subscriber. It evaluates a getter with itself as the
//! active target, so every dep read during the evaluation subscribes it.
//! After each evaluation it is subscribed to exactly what it read.
//!
//! ## Computed Values
//!
//! A [`Computed`] is a lazy watcher that caches its value and recomputes
//! only on the first read after a dependency changes.
//!
//! # Implementation Notes
//!
//! The active target lives on a thread-local stack managed by
//! [`ReactiveContext`]. Everything here is single-threaded: handles are
//! `Rc`, and a dep holds only weak references to its subscribers.

mod computed;
mod context;
mod dep;
mod runtime;
mod subscriber;
mod watch;
mod watcher;

pub use computed::Computed;
pub use context::ReactiveContext;
pub use dep::{Dep, DepId};
pub use runtime::{ErrorHandler, Runtime};
pub use subscriber::{Subscriber, WatcherId};
pub use watch::{parse_path, watch, watch_path, WatchHandle, WatchOptions};
pub use watcher::{WatchCallback, WatchValue, Watcher, WatcherOptions};
