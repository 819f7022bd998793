//! User Watch API
//!
//! [`watch`] runs a callback whenever a getter's result changes, the way a
//! component's `$watch` does. [`watch_path`] is the string form: it watches a
//! dot-delimited path into a reactive object.
//!
//! Both return a [`WatchHandle`]. The watch lives exactly as long as the
//! handle: call [`WatchHandle::unwatch`] or drop it to stop watching.

use super::watcher::{WatchValue, Watcher, WatcherOptions};
use crate::error::{ReactiveError, Result};
use crate::observer::{ReactiveObject, Value};

/// Options for [`watch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Fire on nested mutations too.
    pub deep: bool,

    /// Call the callback once right away with no old value.
    pub immediate: bool,

    /// Run inside the notification instead of on the next flush.
    pub sync: bool,
}

/// A live user watch. Dropping it stops the watch.
#[must_use = "the watch stops as soon as its handle is dropped"]
pub struct WatchHandle<T: WatchValue> {
    watcher: Watcher<T>,
}

impl<T: WatchValue> WatchHandle<T> {
    /// Stop watching.
    pub fn unwatch(&self) {
        self.watcher.teardown();
    }

    /// The latest value seen by the watch.
    pub fn value(&self) -> Option<T> {
        self.watcher.value()
    }

    /// The backing watcher.
    pub fn watcher(&self) -> &Watcher<T> {
        &self.watcher
    }
}

/// Call `callback(new, old)` whenever `getter`'s result changes.
///
/// The getter runs once immediately to collect dependencies; an error there
/// is returned. Later failures are reported through the runtime's error
/// channel.
pub fn watch<T, G, C>(getter: G, callback: C, options: WatchOptions) -> Result<WatchHandle<T>>
where
    T: WatchValue,
    G: Fn() -> Result<T> + 'static,
    C: Fn(&T, Option<&T>) + 'static,
{
    watch_labeled(None, Box::new(getter), Box::new(callback), options)
}

/// Watch a dot-delimited `path` (for example `"user.address.city"`) below
/// `root`. Missing segments read as [`Value::Null`]; numeric segments index
/// into arrays.
pub fn watch_path<C>(
    root: &ReactiveObject,
    path: &str,
    callback: C,
    options: WatchOptions,
) -> Result<WatchHandle<Value>>
where
    C: Fn(&Value, Option<&Value>) + 'static,
{
    let segments = parse_path(path)?;
    let root = root.clone();
    let getter = move || Ok(resolve_path(&root, &segments));

    watch_labeled(
        Some(path.to_string()),
        Box::new(getter),
        Box::new(callback),
        options,
    )
}

fn watch_labeled<T: WatchValue>(
    expression: Option<String>,
    getter: Box<dyn Fn() -> Result<T>>,
    callback: Box<dyn Fn(&T, Option<&T>)>,
    options: WatchOptions,
) -> Result<WatchHandle<T>> {
    let mut watcher_options = WatcherOptions::default()
        .user(true)
        .deep(options.deep)
        .sync(options.sync);
    watcher_options.expression = expression;

    let watcher = Watcher::build(getter, Some(callback), watcher_options)?;
    if options.immediate {
        if let Some(value) = watcher.value() {
            watcher.invoke_callback(&value, None);
        }
    }

    Ok(WatchHandle { watcher })
}

/// Split a watch path into segments, rejecting anything but `[A-Za-z0-9_$.]`.
pub fn parse_path(path: &str) -> Result<Vec<String>> {
    let valid = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'));
    if !valid {
        return Err(ReactiveError::InvalidPath(path.to_string()));
    }
    Ok(path.split('.').map(str::to_string).collect())
}

fn resolve_path(root: &ReactiveObject, segments: &[String]) -> Value {
    let mut current = Value::Object(root.clone());
    for segment in segments {
        current = match &current {
            Value::Object(object) => object.get(segment).unwrap_or_default(),
            Value::Array(array) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| array.get(index))
                .unwrap_or_default(),
            _ => return Value::Null,
        };
    }
    current
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
