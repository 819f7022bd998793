//! Watcher Implementation
//!
//! A Watcher is one reactive computation: a render function, a computed
//! value, or a user watch expression.
//!
//! # How Watchers Work
//!
//! 1. Evaluation pushes the watcher as the active target, runs the getter,
//!    and pops it again. Every dep read in between reports to the watcher.
//!
//! 2. The deps read in this run are collected into `new_deps`. Afterwards
//!    any dep from the previous run that was not read again is unsubscribed,
//!    and `new_deps` becomes `deps`. After every evaluation the watcher is
//!    subscribed to exactly what it last read.
//!
//! 3. When a subscribed dep notifies, the watcher reacts according to its
//!    mode:
//!    - lazy (computed): mark dirty, re-evaluate on next read;
//!    - sync: re-run immediately;
//!    - default: join the scheduler queue and re-run on the next flush.
//!
//! # Lifetime
//!
//! Watcher handles are reference counted. Dropping the last handle tears the
//! watcher down exactly like [`Watcher::teardown`].

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::debug;

use super::context::ReactiveContext;
use super::dep::{Dep, DepId};
use super::runtime::Runtime;
use super::subscriber::{Subscriber, WatcherId};
use crate::error::{ReactiveError, Result};
use crate::scheduler;

/// Values a watcher can produce.
///
/// `has_changed` decides whether a watch callback fires after a re-run.
/// `traverse` is used by deep watchers to subscribe to everything nested
/// inside the value; plain data has nothing to traverse.
pub trait WatchValue: Clone + 'static {
    /// Whether moving from `previous` to `self` counts as a change.
    fn has_changed(&self, previous: &Self) -> bool;

    /// Read every reactive cell reachable from the value.
    fn traverse(&self) {}
}

macro_rules! impl_watch_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WatchValue for $ty {
                fn has_changed(&self, previous: &Self) -> bool {
                    self != previous
                }
            }
        )*
    };
}

impl_watch_value_by_eq!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String,
    &'static str,
);

macro_rules! impl_watch_value_for_float {
    ($($ty:ty),*) => {
        $(
            impl WatchValue for $ty {
                fn has_changed(&self, previous: &Self) -> bool {
                    self != previous && !(self.is_nan() && previous.is_nan())
                }
            }
        )*
    };
}

impl_watch_value_for_float!(f32, f64);

impl<T: WatchValue> WatchValue for Option<T> {
    fn has_changed(&self, previous: &Self) -> bool {
        match (self, previous) {
            (Some(current), Some(previous)) => current.has_changed(previous),
            (None, None) => false,
            _ => true,
        }
    }

    fn traverse(&self) {
        if let Some(value) = self {
            value.traverse();
        }
    }
}

impl<T: WatchValue> WatchValue for Vec<T> {
    fn has_changed(&self, previous: &Self) -> bool {
        self.len() != previous.len()
            || self
                .iter()
                .zip(previous.iter())
                .any(|(current, previous)| current.has_changed(previous))
    }

    fn traverse(&self) {
        for value in self {
            value.traverse();
        }
    }
}

/// Callback invoked with `(new, old)` after a re-run changes the value.
/// `old` is `None` only for the `immediate` call of a user watch.
pub type WatchCallback<T> = Box<dyn Fn(&T, Option<&T>)>;

/// Construction options for a [`Watcher`].
#[derive(Default)]
pub struct WatcherOptions {
    /// Subscribe to everything nested inside the value, not just what the
    /// getter read.
    pub deep: bool,

    /// Created through the user-facing watch API. Callback failures are
    /// reported as `callback for watcher "<expression>"`.
    pub user: bool,

    /// Defer evaluation until read (computed values).
    pub lazy: bool,

    /// Re-run inside the notification instead of queueing.
    pub sync: bool,

    /// Label used in diagnostics.
    pub expression: Option<String>,

    /// Called by the scheduler right before each queued re-run.
    pub before: Option<Box<dyn Fn()>>,
}

impl WatcherOptions {
    /// Set the `deep` flag.
    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    /// Set the `lazy` flag.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Set the `sync` flag.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Set the `user` flag.
    pub fn user(mut self, user: bool) -> Self {
        self.user = user;
        self
    }

    /// Set the diagnostic label.
    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Set the pre-run hook.
    pub fn before<F>(mut self, before: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.before = Some(Box::new(before));
        self
    }
}

impl fmt::Debug for WatcherOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherOptions")
            .field("deep", &self.deep)
            .field("user", &self.user)
            .field("lazy", &self.lazy)
            .field("sync", &self.sync)
            .field("expression", &self.expression)
            .field("before", &self.before.is_some())
            .finish()
    }
}

type DepList = SmallVec<[Rc<Dep>; 4]>;

pub(crate) struct WatcherInner<T: WatchValue> {
    id: WatcherId,
    expression: String,
    getter: Box<dyn Fn() -> Result<T>>,
    callback: Option<WatchCallback<T>>,
    before: Option<Box<dyn Fn()>>,
    deep: bool,
    user: bool,
    lazy: bool,
    sync: bool,
    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Option<T>>,
    deps: RefCell<DepList>,
    new_deps: RefCell<DepList>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_dep_ids: RefCell<HashSet<DepId>>,
    self_ref: Weak<WatcherInner<T>>,
}

/// Reconciles dependencies when an evaluation ends, however it ends.
struct Reconcile<'a, T: WatchValue>(&'a WatcherInner<T>);

impl<T: WatchValue> Drop for Reconcile<'_, T> {
    fn drop(&mut self) {
        self.0.cleanup_deps();
    }
}

impl<T: WatchValue> WatcherInner<T> {
    /// Evaluate the getter while collecting dependencies.
    fn get(&self) -> Result<T> {
        if !self.active.get() {
            return Err(ReactiveError::Inactive);
        }
        let this = self.self_ref.upgrade().ok_or(ReactiveError::Inactive)?;

        // Declared first so it drops last: the target is popped before the
        // dependency lists are reconciled.
        let _reconcile = Reconcile(self);
        let _ctx = ReactiveContext::enter(this);

        let value = (self.getter)()?;
        if self.deep {
            value.traverse();
        }
        Ok(value)
    }

    fn cleanup_deps(&self) {
        let mut deps = self.deps.borrow_mut();
        {
            let new_dep_ids = self.new_dep_ids.borrow();
            for dep in deps.iter() {
                if !new_dep_ids.contains(&dep.id()) {
                    dep.remove_sub(self.id);
                }
            }
        }

        std::mem::swap(
            &mut *self.dep_ids.borrow_mut(),
            &mut *self.new_dep_ids.borrow_mut(),
        );
        self.new_dep_ids.borrow_mut().clear();
        *deps = std::mem::take(&mut *self.new_deps.borrow_mut());
    }

    fn evaluate(&self) -> Result<()> {
        let value = self.get()?;
        *self.value.borrow_mut() = Some(value);
        self.dirty.set(false);
        Ok(())
    }

    fn depend(&self) {
        let deps: DepList = self.deps.borrow().clone();
        for dep in deps {
            dep.depend();
        }
    }

    fn teardown(&self) {
        if !self.active.get() {
            return;
        }

        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps {
            dep.remove_sub(self.id);
        }
        self.dep_ids.borrow_mut().clear();
        scheduler::dequeue(self.id);
        self.active.set(false);

        debug!(watcher = %self.id, expression = %self.expression, "watcher torn down");
    }

    /// User callbacks are host code: their panics are reported under their
    /// own label and never unwind into the flush or the writer.
    fn invoke_callback(&self, value: &T, old: Option<&T>) {
        let Some(callback) = &self.callback else {
            return;
        };
        if self.user {
            let label = format!("callback for watcher \"{}\"", self.expression);
            Runtime::guard(&label, || {
                callback(value, old);
                Ok(())
            });
        } else {
            callback(value, old);
        }
    }
}

impl<T: WatchValue> Subscriber for WatcherInner<T> {
    fn id(&self) -> WatcherId {
        self.id
    }

    fn expression(&self) -> &str {
        &self.expression
    }

    fn add_dep(&self, dep: &Rc<Dep>) {
        let id = dep.id();
        if !self.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        self.new_deps.borrow_mut().push(Rc::clone(dep));

        if !self.dep_ids.borrow().contains(&id) {
            let subscriber: Weak<dyn Subscriber> = self.self_ref.clone();
            dep.add_sub(self.id, subscriber);
        }
    }

    fn update(&self) {
        if self.lazy {
            self.dirty.set(true);
        } else if self.sync {
            // Runs inside `Dep::notify`: a failure must reach neither the
            // writer nor the remaining subscribers.
            Runtime::guard(&self.expression, || self.run());
        } else if let Some(this) = self.self_ref.upgrade() {
            let subscriber: Rc<dyn Subscriber> = this;
            scheduler::queue_watcher(&subscriber);
        }
    }

    fn run(&self) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }

        let value = self.get()?;
        let changed = match self.value.borrow().as_ref() {
            Some(previous) => value.has_changed(previous),
            None => true,
        };

        if changed || self.deep {
            let old = self.value.replace(Some(value.clone()));
            self.invoke_callback(&value, old.as_ref());
        }
        Ok(())
    }

    fn before(&self) {
        if let Some(before) = &self.before {
            before();
        }
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl<T: WatchValue> Drop for WatcherInner<T> {
    fn drop(&mut self) {
        if !self.active.get() {
            return;
        }
        for dep in self.deps.get_mut().drain(..) {
            dep.remove_sub(self.id);
        }
        scheduler::dequeue(self.id);
    }
}

/// A reactive computation.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(json!({ "count": 1 }));
/// let obj = state.as_object().unwrap().clone();
///
/// let doubled = Watcher::new(move || {
///     Ok(obj.get("count").and_then(|v| v.as_f64()).unwrap_or(0.0) * 2.0)
/// })?;
/// assert_eq!(doubled.value(), Some(2.0));
/// ```
pub struct Watcher<T: WatchValue> {
    inner: Rc<WatcherInner<T>>,
}

impl<T: WatchValue> Watcher<T> {
    /// Create a watcher and evaluate it once to collect its dependencies.
    ///
    /// An error from that first evaluation is returned to the caller.
    pub fn new<F>(getter: F) -> Result<Self>
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self::with_options(getter, WatcherOptions::default())
    }

    /// Create a watcher with explicit options. Lazy watchers are not
    /// evaluated until first read.
    pub fn with_options<F>(getter: F, options: WatcherOptions) -> Result<Self>
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self::build(Box::new(getter), None, options)
    }

    /// Build a watcher and, unless it is lazy, run its first evaluation.
    pub(crate) fn build(
        getter: Box<dyn Fn() -> Result<T>>,
        callback: Option<WatchCallback<T>>,
        options: WatcherOptions,
    ) -> Result<Self> {
        let watcher = Self::construct(getter, callback, options);
        if !watcher.inner.lazy {
            let value = watcher.inner.get()?;
            *watcher.inner.value.borrow_mut() = Some(value);
        }
        Ok(watcher)
    }

    /// Build a watcher without evaluating it.
    pub(crate) fn construct(
        getter: Box<dyn Fn() -> Result<T>>,
        callback: Option<WatchCallback<T>>,
        options: WatcherOptions,
    ) -> Self {
        let id = WatcherId::new();
        let expression = options
            .expression
            .unwrap_or_else(|| format!("watcher {id}"));
        let lazy = options.lazy;

        let inner = Rc::new_cyclic(|self_ref| WatcherInner {
            id,
            expression,
            getter,
            callback,
            before: options.before,
            deep: options.deep,
            user: options.user,
            lazy,
            sync: options.sync,
            active: Cell::new(true),
            dirty: Cell::new(lazy),
            value: RefCell::new(None),
            deps: RefCell::new(SmallVec::new()),
            new_deps: RefCell::new(SmallVec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            self_ref: self_ref.clone(),
        });

        Self { inner }
    }

    /// Get the watcher's unique ID.
    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    /// The diagnostic label.
    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    /// The cached value from the last evaluation.
    pub fn value(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// Re-run the getter and update the cached value, firing the callback if
    /// the value changed.
    pub fn run(&self) -> Result<()> {
        self.inner.run()
    }

    /// Re-evaluate a lazy watcher and clear its dirty flag.
    pub fn evaluate(&self) -> Result<()> {
        self.inner.evaluate()
    }

    /// React as if a dependency had changed.
    pub fn update(&self) {
        self.inner.update();
    }

    /// Re-queue the watcher even though nothing changed.
    pub fn force_update(&self) {
        self.inner.update();
    }

    /// Subscribe the active target to everything this watcher depends on.
    pub fn depend(&self) {
        self.inner.depend();
    }

    /// Unsubscribe from every dep and leave the queue. Idempotent.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    /// Whether the watcher is still live.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Whether a lazy watcher needs re-evaluation.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Whether the watcher defers evaluation until read.
    pub fn is_lazy(&self) -> bool {
        self.inner.lazy
    }

    /// Whether the watcher was created by the user-facing watch API.
    pub fn is_user(&self) -> bool {
        self.inner.user
    }

    /// IDs of the deps read by the last evaluation, in first-read order.
    pub fn dep_ids(&self) -> Vec<DepId> {
        self.inner.deps.borrow().iter().map(|dep| dep.id()).collect()
    }

    /// Number of deps read by the last evaluation.
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    pub(crate) fn invoke_callback(&self, value: &T, old: Option<&T>) {
        self.inner.invoke_callback(value, old);
    }
}

impl<T: WatchValue> Clone for Watcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: WatchValue + fmt::Debug> fmt::Debug for Watcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("expression", &self.inner.expression)
            .field("value", &*self.inner.value.borrow())
            .field("dirty", &self.is_dirty())
            .field("active", &self.is_active())
            .field("dep_count", &self.dep_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{reactive, ReactiveObject, Value};
    use crate::scheduler::run_until_idle;
    use serde_json::json;

    fn state(json: serde_json::Value) -> ReactiveObject {
        reactive(json).as_object().cloned().unwrap()
    }

    fn number(obj: &ReactiveObject, key: &str) -> f64 {
        obj.get(key).and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
    }

    fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        (count.clone(), count)
    }

    #[test]
    fn watcher_evaluates_on_creation() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let watcher = Watcher::new(move || Ok(number(&reader, "a"))).unwrap();

        assert_eq!(watcher.value(), Some(1.0));
        assert_eq!(watcher.dep_count(), 1);
        assert!(!watcher.is_dirty());
    }

    #[test]
    fn watcher_reruns_on_flush() {
        let obj = state(json!({ "a": 1 }));
        let (runs, runs_in) = counter();
        let reader = obj.clone();
        let watcher = Watcher::new(move || {
            runs_in.set(runs_in.get() + 1);
            Ok(number(&reader, "a"))
        })
        .unwrap();

        obj.set("a", 2);
        assert_eq!(runs.get(), 1);
        assert!(scheduler::is_queued(watcher.id()));

        run_until_idle();
        assert_eq!(runs.get(), 2);
        assert_eq!(watcher.value(), Some(2.0));
    }

    #[test]
    fn stale_dependencies_are_pruned() {
        let obj = state(json!({ "flag": true, "a": 1, "b": 2 }));
        let reader = obj.clone();
        let watcher = Watcher::new(move || {
            let flag = reader.get("flag").and_then(|v| v.as_bool()).unwrap_or(false);
            Ok(if flag { number(&reader, "a") } else { number(&reader, "b") })
        })
        .unwrap();

        let flag_dep = obj.property_dep("flag").unwrap();
        let a_dep = obj.property_dep("a").unwrap();
        let b_dep = obj.property_dep("b").unwrap();
        assert_eq!(watcher.dep_ids(), vec![flag_dep.id(), a_dep.id()]);

        obj.set("flag", false);
        run_until_idle();

        assert_eq!(watcher.dep_ids(), vec![flag_dep.id(), b_dep.id()]);
        assert_eq!(a_dep.subscriber_count(), 0);
        assert_eq!(b_dep.subscriber_ids(), vec![watcher.id()]);
    }

    #[test]
    fn repeated_reads_subscribe_once() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let watcher = Watcher::new(move || {
            Ok(number(&reader, "a") + number(&reader, "a") + number(&reader, "a"))
        })
        .unwrap();

        let dep = obj.property_dep("a").unwrap();
        assert_eq!(watcher.dep_count(), 1);
        assert_eq!(dep.subscriber_count(), 1);

        // Re-running keeps a single subscription.
        watcher.run().unwrap();
        assert_eq!(dep.subscriber_count(), 1);
    }

    #[test]
    fn sync_watcher_runs_inside_notify() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let watcher = Watcher::with_options(
            move || Ok(number(&reader, "a")),
            WatcherOptions::default().sync(true),
        )
        .unwrap();

        obj.set("a", 5);
        assert_eq!(watcher.value(), Some(5.0));
        assert!(!scheduler::is_queued(watcher.id()));
    }

    #[test]
    fn panicking_sync_watcher_does_not_reach_the_writer() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        Runtime::set_error_handler(move |err, _| sink.borrow_mut().push(err.clone()));

        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let _sync = Watcher::with_options(
            move || {
                let a = number(&reader, "a");
                if a > 1.0 {
                    panic!("sync exploded");
                }
                Ok(a)
            },
            WatcherOptions::default().sync(true),
        )
        .unwrap();

        let (runs, runs_in) = counter();
        let reader = obj.clone();
        let deferred = Watcher::new(move || {
            runs_in.set(runs_in.get() + 1);
            Ok(number(&reader, "a"))
        })
        .unwrap();

        // The sync watcher subscribed first, so it is notified first.
        obj.set("a", 2);
        assert!(scheduler::is_queued(deferred.id()));

        run_until_idle();
        Runtime::clear_error_handler();

        assert_eq!(runs.get(), 2);
        assert_eq!(deferred.value(), Some(2.0));
        assert!(matches!(
            errors.borrow().as_slice(),
            [ReactiveError::Panicked { message, .. }] if message == "sync exploded"
        ));
    }

    #[test]
    fn lazy_watcher_marks_dirty_instead_of_running() {
        let obj = state(json!({ "a": 1 }));
        let (runs, runs_in) = counter();
        let reader = obj.clone();
        let watcher = Watcher::with_options(
            move || {
                runs_in.set(runs_in.get() + 1);
                Ok(number(&reader, "a"))
            },
            WatcherOptions::default().lazy(true),
        )
        .unwrap();

        assert!(watcher.is_dirty());
        assert_eq!(runs.get(), 0);
        assert_eq!(watcher.value(), None);

        watcher.evaluate().unwrap();
        assert!(!watcher.is_dirty());
        assert_eq!(watcher.value(), Some(1.0));

        obj.set("a", 3);
        assert!(watcher.is_dirty());
        assert!(!scheduler::is_queued(watcher.id()));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn creation_error_propagates_and_restores_target() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let result: Result<Watcher<f64>> = Watcher::new(move || {
            let _ = reader.get("a");
            Err(ReactiveError::evaluation("no value"))
        });

        assert_eq!(result.unwrap_err(), ReactiveError::evaluation("no value"));
        assert!(!Runtime::is_tracking());
        // The failed watcher is gone, so nothing stays subscribed.
        assert_eq!(obj.property_dep("a").unwrap().subscriber_count(), 0);
    }

    #[test]
    fn failed_evaluation_still_reconciles() {
        let obj = state(json!({ "fail": false, "a": 1, "b": 2 }));
        let reader = obj.clone();
        let watcher = Watcher::new(move || {
            let fail = reader.get("fail").and_then(|v| v.as_bool()).unwrap_or(false);
            if fail {
                let _ = reader.get("b");
                return Err(ReactiveError::evaluation("fail flag set"));
            }
            Ok(number(&reader, "a"))
        })
        .unwrap();

        obj.set("fail", true);
        assert!(watcher.run().is_err());

        let a_dep = obj.property_dep("a").unwrap();
        let b_dep = obj.property_dep("b").unwrap();
        assert_eq!(a_dep.subscriber_count(), 0);
        assert_eq!(b_dep.subscriber_count(), 1);
        run_until_idle();
    }

    #[test]
    fn teardown_unsubscribes_and_dequeues() {
        let obj = state(json!({ "a": 1 }));
        let (runs, runs_in) = counter();
        let reader = obj.clone();
        let watcher = Watcher::new(move || {
            runs_in.set(runs_in.get() + 1);
            Ok(number(&reader, "a"))
        })
        .unwrap();

        obj.set("a", 2);
        assert!(scheduler::is_queued(watcher.id()));

        watcher.teardown();
        assert!(!watcher.is_active());
        assert!(!scheduler::is_queued(watcher.id()));
        assert_eq!(obj.property_dep("a").unwrap().subscriber_count(), 0);

        run_until_idle();
        assert_eq!(runs.get(), 1);
        assert_eq!(watcher.run(), Ok(()));
        assert_eq!(watcher.evaluate(), Err(ReactiveError::Inactive));
    }

    #[test]
    fn dropping_last_handle_unsubscribes() {
        let obj = state(json!({ "a": 1 }));
        let reader = obj.clone();
        let watcher = Watcher::new(move || Ok(number(&reader, "a"))).unwrap();
        let dep = obj.property_dep("a").unwrap();
        assert_eq!(dep.subscriber_count(), 1);

        drop(watcher);
        assert_eq!(dep.subscriber_ids(), Vec::<WatcherId>::new());
    }

    #[test]
    fn depend_forwards_to_active_target() {
        let obj = state(json!({ "a": 1, "b": 2 }));
        let reader = obj.clone();
        let inner = Watcher::with_options(
            move || Ok(number(&reader, "a") + number(&reader, "b")),
            WatcherOptions::default().lazy(true),
        )
        .unwrap();
        inner.evaluate().unwrap();

        let forwarded = inner.clone();
        let outer = Watcher::new(move || {
            forwarded.depend();
            Ok(())
        })
        .unwrap();

        assert_eq!(outer.dep_ids(), inner.dep_ids());
    }

    #[test]
    fn before_hook_runs_ahead_of_queued_rerun() {
        let obj = state(json!({ "a": 1 }));
        let log = Rc::new(RefCell::new(Vec::new()));
        let (reader, getter_log, hook_log) = (obj.clone(), log.clone(), log.clone());

        let _watcher = Watcher::with_options(
            move || {
                getter_log.borrow_mut().push("run");
                Ok(number(&reader, "a"))
            },
            WatcherOptions::default().before(move || hook_log.borrow_mut().push("before")),
        )
        .unwrap();

        obj.set("a", 2);
        run_until_idle();

        assert_eq!(*log.borrow(), vec!["run", "before", "run"]);
    }

    #[test]
    fn deep_watcher_sees_nested_mutation() {
        let obj = state(json!({ "nested": { "inner": { "x": 1 } } }));
        let (runs, runs_in) = counter();
        let reader = obj.clone();
        let _watcher = Watcher::with_options(
            move || {
                runs_in.set(runs_in.get() + 1);
                Ok(reader.get("nested").unwrap_or_default())
            },
            WatcherOptions::default().deep(true),
        )
        .unwrap();

        let inner = obj
            .get_untracked("nested")
            .and_then(|v| v.as_object().cloned())
            .and_then(|nested| nested.get_untracked("inner"))
            .and_then(|v| v.as_object().cloned())
            .unwrap();
        inner.set("x", 2);
        run_until_idle();

        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn float_and_option_change_detection() {
        assert!(!f64::NAN.has_changed(&f64::NAN));
        assert!(1.0f64.has_changed(&2.0));
        assert!(Some(1).has_changed(&None));
        assert!(!Option::<i32>::None.has_changed(&None));
        assert!(vec![1, 2].has_changed(&vec![1]));
        assert!(!vec![1, 2].has_changed(&vec![1, 2]));
        assert!(Value::Null.has_changed(&Value::Bool(false)));
    }
}
