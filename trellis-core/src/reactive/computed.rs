//! Computed Values
//!
//! A Computed is a cached derived value backed by a lazy [`Watcher`].
//!
//! # How Computed Values Work
//!
//! 1. Nothing runs at creation. The first [`Computed::get`] evaluates the
//!    getter and caches the result.
//!
//! 2. When a dependency changes, the watcher is only marked dirty. No work is
//!    queued.
//!
//! 3. The next `get` sees the dirty flag and re-evaluates. Values that are
//!    never read again stay dirty and cost nothing.
//!
//! 4. When read inside another watcher, the reader subscribes to all of the
//!    computed value's own deps, so it re-runs whenever the computed value
//!    would change.

use std::fmt;

use super::context::ReactiveContext;
use super::watcher::{WatchValue, Watcher, WatcherOptions};
use crate::error::{ReactiveError, Result};

/// A cached derived value that recomputes only when its dependencies change.
pub struct Computed<T: WatchValue> {
    watcher: Watcher<T>,
}

impl<T: WatchValue> Computed<T> {
    /// Create a computed value. The getter does not run until first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self::with_expression(getter, None::<String>)
    }

    /// Create a computed value with a diagnostic label.
    pub fn labeled<F>(expression: impl Into<String>, getter: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self::with_expression(getter, Some(expression))
    }

    fn with_expression<F>(getter: F, expression: Option<impl Into<String>>) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        let mut options = WatcherOptions::default().lazy(true);
        options.expression = expression.map(Into::into);

        Self {
            watcher: Watcher::construct(Box::new(getter), None, options),
        }
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> Result<T> {
        if self.watcher.is_dirty() && self.watcher.is_active() {
            self.watcher.evaluate()?;
        }
        if ReactiveContext::is_active() {
            self.watcher.depend();
        }
        self.watcher.value().ok_or(ReactiveError::Inactive)
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    /// The backing watcher.
    pub fn watcher(&self) -> &Watcher<T> {
        &self.watcher
    }

    /// Stop tracking. Later reads return the last cached value without
    /// recomputing, or `Inactive` if it was never computed.
    pub fn teardown(&self) {
        self.watcher.teardown();
    }
}

impl<T: WatchValue> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            watcher: self.watcher.clone(),
        }
    }
}

impl<T: WatchValue + fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.watcher.id())
            .field("value", &self.watcher.value())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{reactive, ReactiveObject};
    use crate::scheduler::run_until_idle;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn state(json: serde_json::Value) -> ReactiveObject {
        reactive(json).as_object().cloned().unwrap()
    }

    #[test]
    fn computed_is_lazy_and_cached() {
        let obj = state(json!({ "a": 21 }));
        let calls = Rc::new(Cell::new(0));
        let (reader, calls_in) = (obj.clone(), calls.clone());
        let doubled = Computed::new(move || {
            calls_in.set(calls_in.get() + 1);
            Ok(reader.get("a").and_then(|v| v.as_f64()).unwrap_or(0.0) * 2.0)
        });

        assert!(doubled.is_dirty());
        assert_eq!(calls.get(), 0);

        assert_eq!(doubled.get(), Ok(42.0));
        assert_eq!(doubled.get(), Ok(42.0));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn computed_recomputes_after_dependency_change() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let plus_one =
            Computed::new(move || Ok(reader.get("a").and_then(|v| v.as_f64()).unwrap_or(0.0) + 1.0));

        assert_eq!(plus_one.get(), Ok(2.0));
        obj.set("a", 10);
        assert!(plus_one.is_dirty());
        assert_eq!(plus_one.get(), Ok(11.0));
    }

    #[test]
    fn reader_of_computed_subscribes_transitively() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let doubled = Computed::labeled("doubled", move || {
            Ok(reader.get("a").and_then(|v| v.as_f64()).unwrap_or(0.0) * 2.0)
        });

        let seen = Rc::new(Cell::new(0.0));
        let (source, sink) = (doubled.clone(), seen.clone());
        let render = Watcher::new(move || {
            sink.set(source.get()?);
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.get(), 2.0);
        assert_eq!(render.dep_ids(), doubled.watcher().dep_ids());

        obj.set("a", 4);
        run_until_idle();
        assert_eq!(seen.get(), 8.0);
    }

    #[test]
    fn computed_error_leaves_it_dirty() {
        let obj = state(json!({ "ok": false }));
        let reader = obj.clone();
        let checked = Computed::new(move || match reader.get("ok").and_then(|v| v.as_bool()) {
            Some(true) => Ok(1),
            _ => Err(ReactiveError::evaluation("not ready")),
        });

        assert!(checked.get().is_err());
        assert!(checked.is_dirty());

        obj.set("ok", true);
        assert_eq!(checked.get(), Ok(1));
    }

    #[test]
    fn teardown_keeps_last_value() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let value = Computed::new(move || Ok(reader.get("a").and_then(|v| v.as_f64())));

        assert_eq!(value.get(), Ok(Some(1.0)));
        value.teardown();
        obj.set("a", 2);

        assert!(!value.is_dirty());
        assert_eq!(value.get(), Ok(Some(1.0)));
    }

    #[test]
    fn teardown_while_dirty_returns_stale_value() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let value = Computed::new(move || Ok(reader.get("a").and_then(|v| v.as_f64())));

        assert_eq!(value.get(), Ok(Some(1.0)));
        obj.set("a", 2);
        assert!(value.is_dirty());

        value.teardown();
        assert_eq!(value.get(), Ok(Some(1.0)));

        let never_read = Computed::new(|| Ok(0));
        never_read.teardown();
        assert_eq!(never_read.get(), Err(ReactiveError::Inactive));
    }
}
