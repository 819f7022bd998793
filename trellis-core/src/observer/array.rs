//! Reactive Arrays
//!
//! Array elements have no per-index deps. Instead every mutating method
//! performs the mutation, observes any inserted elements, and notifies the
//! array's structural dep. Readers subscribe to that dep.
//!
//! Writes that bypass the mutators, through
//! [`ReactiveArray::with_untracked_mut`], are invisible to watchers.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::{observe, Observer, Value};

#[derive(Default)]
pub(crate) struct ArrayInner {
    items: RefCell<Vec<Value>>,
    observer: RefCell<Option<Rc<Observer>>>,
}

/// A shared, reactive array. Cloning clones the handle.
#[derive(Clone, Default)]
pub struct ReactiveArray {
    inner: Rc<ArrayInner>,
}

impl ReactiveArray {
    /// Create an empty, unobserved array.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_inner(inner: Rc<ArrayInner>) -> Self {
        Self { inner }
    }

    /// Whether both handles point at the same array.
    pub fn ptr_eq(&self, other: &ReactiveArray) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// The array's observer, if it has been observed.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.observer.borrow().clone()
    }

    pub fn is_observed(&self) -> bool {
        self.inner.observer.borrow().is_some()
    }

    fn depend(&self) {
        if let Some(observer) = self.observer() {
            observer.dep().depend();
        }
    }

    /// Number of elements. Tracked.
    pub fn len(&self) -> usize {
        self.depend();
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`. Tracked.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.depend();
        self.inner.items.borrow().get(index).cloned()
    }

    /// Copy of every element. Tracked.
    pub fn to_vec(&self) -> Vec<Value> {
        self.depend();
        self.items_untracked()
    }

    pub(crate) fn items_untracked(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    /// Append an element. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let value = value.into();
        self.mutate(vec![value.clone()], |items| {
            items.push(value);
            items.len()
        })
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        self.mutate(Vec::new(), |items| items.pop())
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        self.mutate(Vec::new(), |items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
    }

    /// Prepend elements, keeping their order. Returns the new length.
    pub fn unshift(&self, values: Vec<Value>) -> usize {
        self.mutate(values.clone(), |items| {
            let tail = std::mem::replace(items, values);
            items.extend(tail);
            items.len()
        })
    }

    /// Remove `delete_count` elements starting at `start` and insert `values`
    /// in their place. Both bounds are clamped to the array. Returns the
    /// removed elements.
    pub fn splice(&self, start: usize, delete_count: usize, values: Vec<Value>) -> Vec<Value> {
        self.mutate(values.clone(), |items| {
            let start = start.min(items.len());
            let end = start + delete_count.min(items.len() - start);
            items.splice(start..end, values).collect()
        })
    }

    /// Sort by string conversion, the default ordering of a dynamic array.
    /// The sort is stable.
    pub fn sort(&self) {
        self.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
    }

    /// Sort with a comparator. The sort is stable.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        // Sorted outside the borrow so the comparator may read the array.
        let mut items = self.items_untracked();
        items.sort_by(compare);
        self.mutate(Vec::new(), |slot| *slot = items);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.mutate(Vec::new(), |items| items.reverse());
    }

    /// Write `value` at `index`, padding with nulls if the array is shorter.
    /// Goes through `splice`, so watchers are notified.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        {
            let mut items = self.inner.items.borrow_mut();
            if items.len() < index {
                items.resize(index, Value::Null);
            }
        }
        self.splice(index, 1, vec![value.into()]);
    }

    /// Mutate the raw storage without notifying anyone. Elements inserted
    /// this way are not observed.
    pub fn with_untracked_mut<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        f(&mut self.inner.items.borrow_mut())
    }

    fn mutate<R>(&self, inserted: Vec<Value>, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let result = f(&mut self.inner.items.borrow_mut());

        if let Some(observer) = self.observer() {
            for value in &inserted {
                observe(value, false);
            }
            observer.dep().notify();
        }
        result
    }

    /// Attach a fresh observer and observe every element.
    pub(crate) fn attach_observer(&self) -> Rc<Observer> {
        let observer = Observer::for_array(&self.inner);
        *self.inner.observer.borrow_mut() = Some(Rc::clone(&observer));
        self.observe_items();
        observer
    }

    /// Observe every element that is a container.
    pub fn observe_items(&self) {
        for item in self.items_untracked() {
            observe(&item, false);
        }
    }
}

impl From<Vec<Value>> for ReactiveArray {
    fn from(items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
                items: RefCell::new(items),
                observer: RefCell::new(None),
            }),
        }
    }
}

impl FromIterator<Value> for ReactiveArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl fmt::Debug for ReactiveArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.inner.items.try_borrow().map(|items| items.len()).ok();
        f.debug_struct("ReactiveArray")
            .field("len", &len)
            .field("observed", &self.is_observed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
