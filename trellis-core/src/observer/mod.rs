//! Observation Layer
//!
//! Turns plain data into reactive data. A [`Value`] is a dynamically typed
//! tree of nulls, booleans, numbers, strings, arrays and objects. Observing
//! it attaches an [`Observer`] to every container:
//!
//! - each object property gets its own [`Dep`], depended on by reads and
//!   notified by writes;
//! - each container gets one structural dep, notified when keys are added
//!   or removed and by every array mutator.
//!
//! Observation is gated by a thread-wide conversion toggle. Initialization
//! code that hands over data it does not want made reactive turns the toggle
//! off with a [`ConversionGuard`].

mod array;
mod object;
mod traverse;
mod value;

use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::reactive::Dep;

pub use array::ReactiveArray;
pub use object::ReactiveObject;
pub use traverse::traverse;
pub use value::Value;

use array::ArrayInner;
use object::ObjectInner;

thread_local! {
    static SHOULD_CONVERT: Cell<bool> = const { Cell::new(true) };
}

/// Whether [`observe`] currently creates new observers.
pub fn should_convert() -> bool {
    SHOULD_CONVERT.with(Cell::get)
}

/// Set the conversion toggle. Returns the previous setting.
pub fn set_should_convert(enabled: bool) -> bool {
    SHOULD_CONVERT.with(|flag| flag.replace(enabled))
}

/// Sets the conversion toggle and restores the previous setting on drop.
#[must_use = "the previous setting is restored as soon as the guard is dropped"]
pub struct ConversionGuard {
    previous: bool,
}

impl ConversionGuard {
    /// Set the toggle to `enabled` until the guard is dropped.
    pub fn set(enabled: bool) -> Self {
        Self {
            previous: set_should_convert(enabled),
        }
    }
}

impl Drop for ConversionGuard {
    fn drop(&mut self) {
        let _ = SHOULD_CONVERT.try_with(|flag| flag.set(self.previous));
    }
}

/// Run `f` with the conversion toggle set to `enabled`.
pub fn with_conversion<R>(enabled: bool, f: impl FnOnce() -> R) -> R {
    let _guard = ConversionGuard::set(enabled);
    f()
}

#[derive(Clone)]
enum ObservedRef {
    Object(Weak<ObjectInner>),
    Array(Weak<ArrayInner>),
}

/// The reactive attachment of one container.
pub struct Observer {
    dep: Rc<Dep>,
    value: ObservedRef,
    vm_count: Cell<usize>,
}

impl Observer {
    fn for_object(object: &Rc<ObjectInner>) -> Rc<Self> {
        Rc::new(Self {
            dep: Dep::new(),
            value: ObservedRef::Object(Rc::downgrade(object)),
            vm_count: Cell::new(0),
        })
    }

    fn for_array(array: &Rc<ArrayInner>) -> Rc<Self> {
        Rc::new(Self {
            dep: Dep::new(),
            value: ObservedRef::Array(Rc::downgrade(array)),
            vm_count: Cell::new(0),
        })
    }

    /// The structural dep.
    pub fn dep(&self) -> &Rc<Dep> {
        &self.dep
    }

    /// The observed container, if it is still alive.
    pub fn value(&self) -> Option<Value> {
        match &self.value {
            ObservedRef::Object(weak) => weak
                .upgrade()
                .map(|inner| Value::Object(ReactiveObject::from_inner(inner))),
            ObservedRef::Array(weak) => weak
                .upgrade()
                .map(|inner| Value::Array(ReactiveArray::from_inner(inner))),
        }
    }

    /// How many component instances use the container as root data.
    pub fn vm_count(&self) -> usize {
        self.vm_count.get()
    }

    /// Root data refuses property addition and deletion.
    pub fn is_root_data(&self) -> bool {
        self.vm_count.get() > 0
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("dep", &self.dep.id())
            .field("vm_count", &self.vm_count.get())
            .finish()
    }
}

/// Make `value` reactive.
///
/// Returns the container's observer, creating it when the value has none
/// and conversion is enabled. Primitives are never observed.
/// `as_root_data` marks the container as a component's root data.
pub fn observe(value: &Value, as_root_data: bool) -> Option<Rc<Observer>> {
    let observer = match value {
        Value::Object(object) => match object.observer() {
            Some(observer) => observer,
            None if should_convert() => object.attach_observer(),
            None => return None,
        },
        Value::Array(array) => match array.observer() {
            Some(observer) => observer,
            None if should_convert() => array.attach_observer(),
            None => return None,
        },
        _ => return None,
    };

    if as_root_data {
        observer.vm_count.set(observer.vm_count.get() + 1);
    }
    Some(observer)
}

/// Convert `value` and make it reactive.
///
/// ```rust,ignore
/// let state = reactive(json!({ "count": 0 }));
/// let obj = state.as_object().unwrap();
/// obj.set("count", 1);
/// ```
pub fn reactive(value: impl Into<Value>) -> Value {
    let value = value.into();
    observe(&value, false);
    value
}

/// Subscribe the active watcher to the structural deps of a value just read
/// from a property, so mutating the value itself (not just replacing it)
/// re-runs the reader.
pub(crate) fn depend_child(value: &Value) {
    let Some(observer) = value.observer() else {
        return;
    };
    observer.dep().depend();
    if let Value::Array(array) = value {
        let mut seen = HashSet::new();
        depend_array(array, &mut seen);
    }
}

/// Array elements have no property deps of their own, so depend on the
/// structural dep of every observed element, nested arrays included.
fn depend_array(array: &ReactiveArray, seen: &mut HashSet<usize>) {
    if !seen.insert(array.addr()) {
        return;
    }
    for item in array.items_untracked() {
        if let Some(observer) = item.observer() {
            observer.dep().depend();
        }
        if let Value::Array(nested) = &item {
            depend_array(nested, seen);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
