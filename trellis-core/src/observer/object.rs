//! Reactive Objects
//!
//! An ordered string-keyed map whose properties are tracked individually.
//!
//! # How Properties Work
//!
//! Once the object is observed, every property slot owns a [`Dep`]:
//!
//! 1. [`ReactiveObject::get`] depends on the slot's dep. If the value read is
//!    itself an observed container, the reader also depends on that
//!    container's structural dep (and, for arrays, on every observed
//!    element's), so in-place mutation of the child re-runs the reader.
//!
//! 2. [`ReactiveObject::set`] compares by identity and notifies the slot's
//!    dep only on an actual change. New containers are observed on the way
//!    in.
//!
//! 3. Adding or removing a key notifies the object's structural dep.
//!    Reads of the key set (`keys`, `len`, `contains_key`, and reads of a
//!    missing key) depend on it.
//!
//! Before the object is observed it behaves like a plain map and nothing is
//! tracked.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::warn;

use super::{depend_child, observe, Observer, Value};
use crate::reactive::{Dep, ReactiveContext};

struct Slot {
    value: Value,
    dep: Option<Rc<Dep>>,
}

#[derive(Default)]
pub(crate) struct ObjectInner {
    props: RefCell<IndexMap<String, Slot>>,
    observer: RefCell<Option<Rc<Observer>>>,
}

/// A shared, reactive string-keyed object. Cloning clones the handle.
#[derive(Clone, Default)]
pub struct ReactiveObject {
    inner: Rc<ObjectInner>,
}

enum WriteOutcome {
    Unchanged,
    Replaced(Option<Rc<Dep>>),
    Added,
    Refused,
}

impl ReactiveObject {
    /// Create an empty, unobserved object.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_inner(inner: Rc<ObjectInner>) -> Self {
        Self { inner }
    }

    /// Create an unobserved object from key/value pairs.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let props = entries
            .into_iter()
            .map(|(key, value)| {
                let slot = Slot {
                    value: value.into(),
                    dep: None,
                };
                (key.into(), slot)
            })
            .collect();

        Self {
            inner: Rc::new(ObjectInner {
                props: RefCell::new(props),
                observer: RefCell::new(None),
            }),
        }
    }

    /// Whether both handles point at the same object.
    pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// Read a property, subscribing the active watcher to it.
    pub fn get(&self, key: &str) -> Option<Value> {
        let read = {
            let props = self.inner.props.borrow();
            props
                .get(key)
                .map(|slot| (slot.value.clone(), slot.dep.clone()))
        };

        if !ReactiveContext::is_active() {
            return read.map(|(value, _)| value);
        }

        match read {
            Some((value, dep)) => {
                if let Some(dep) = dep {
                    dep.depend();
                    depend_child(&value);
                }
                Some(value)
            }
            None => {
                self.depend_structure();
                None
            }
        }
    }

    /// Read a property without tracking.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.inner
            .props
            .borrow()
            .get(key)
            .map(|slot| slot.value.clone())
    }

    /// Write a property.
    ///
    /// Writing an identical value is a no-op. Writing a missing key adds it
    /// as a reactive property, except on root data, which refuses new keys.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let observer = self.observer();

        let outcome = {
            let mut props = self.inner.props.borrow_mut();
            match props.get_mut(&key) {
                Some(slot) if slot.value.same(&value) => WriteOutcome::Unchanged,
                Some(slot) => {
                    slot.value = value.clone();
                    WriteOutcome::Replaced(slot.dep.clone())
                }
                None => match &observer {
                    Some(observer) if observer.is_root_data() => WriteOutcome::Refused,
                    Some(_) => {
                        let slot = Slot {
                            value: value.clone(),
                            dep: Some(Dep::new()),
                        };
                        props.insert(key.clone(), slot);
                        WriteOutcome::Added
                    }
                    None => {
                        props.insert(key.clone(), Slot { value, dep: None });
                        return;
                    }
                },
            }
        };

        match outcome {
            WriteOutcome::Unchanged | WriteOutcome::Replaced(None) => {}
            WriteOutcome::Replaced(Some(dep)) => {
                observe(&value, false);
                dep.notify();
            }
            WriteOutcome::Added => {
                observe(&value, false);
                if let Some(observer) = observer {
                    observer.dep().notify();
                }
            }
            WriteOutcome::Refused => {
                warn!(
                    key = %key,
                    "refusing to add a reactive property to root data at runtime; declare it upfront"
                );
            }
        }
    }

    /// Remove a property, notifying watchers of the key set. Root data
    /// refuses removal.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let observer = self.observer();
        if observer.as_ref().is_some_and(|observer| observer.is_root_data()) {
            warn!(key = %key, "refusing to delete a property of root data");
            return None;
        }

        let removed = self.inner.props.borrow_mut().shift_remove(key)?;
        if let Some(observer) = observer {
            observer.dep().notify();
        }
        Some(removed.value)
    }

    /// Whether the key exists. Tracks the key set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.depend_structure();
        self.inner.props.borrow().contains_key(key)
    }

    /// The keys in insertion order. Tracks the key set.
    pub fn keys(&self) -> Vec<String> {
        self.depend_structure();
        self.inner.props.borrow().keys().cloned().collect()
    }

    /// Number of properties. Tracks the key set.
    pub fn len(&self) -> usize {
        self.depend_structure();
        self.inner.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn entries_untracked(&self) -> Vec<(String, Value)> {
        self.inner
            .props
            .borrow()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.value.clone()))
            .collect()
    }

    /// The dep of a property, once the object is observed.
    pub fn property_dep(&self, key: &str) -> Option<Rc<Dep>> {
        self.inner.props.borrow().get(key)?.dep.clone()
    }

    /// The object's observer, if it has been observed.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.observer.borrow().clone()
    }

    pub fn is_observed(&self) -> bool {
        self.inner.observer.borrow().is_some()
    }

    fn depend_structure(&self) {
        if let Some(observer) = self.observer() {
            observer.dep().depend();
        }
    }

    /// Attach a fresh observer and convert every property.
    ///
    /// The observer is stored before the walk so a cycle back to this object
    /// finds it instead of observing again.
    pub(crate) fn attach_observer(&self) -> Rc<Observer> {
        let observer = Observer::for_object(&self.inner);
        *self.inner.observer.borrow_mut() = Some(Rc::clone(&observer));

        let children: Vec<Value> = {
            let mut props = self.inner.props.borrow_mut();
            props
                .values_mut()
                .map(|slot| {
                    slot.dep.get_or_insert_with(Dep::new);
                    slot.value.clone()
                })
                .collect()
        };
        for child in &children {
            observe(child, false);
        }

        observer
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ReactiveObject {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = match self.inner.props.try_borrow() {
            Ok(props) => props.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("ReactiveObject")
            .field("keys", &keys)
            .field("observed", &self.is_observed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
