//! Reactive Context
//!
//! The reactive context tracks which watcher is currently evaluating. When a
//! dependency is read, it asks the context for the active target and lets
//! that target subscribe.
//!
//! # Implementation
//!
//! We use a thread-local stack. The top entry is the active target; the
//! entries below it are the evaluations it interrupted. Entering a context
//! pushes, and dropping the returned guard pops, so the previous target is
//! restored on every exit path, including `?` returns and panics.
//!
//! An entry may be empty: [`ReactiveContext::untracked`] pushes a blank slot
//! so reads inside it are not attributed to the enclosing watcher.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, WatcherId};

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Rc<dyn Subscriber>>>> = RefCell::new(Vec::new());
}

/// Guard that pops the context when dropped.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ReactiveContext {
    target: Option<WatcherId>,
}

impl ReactiveContext {
    /// Make `target` the active watcher until the guard is dropped.
    pub fn enter(target: Rc<dyn Subscriber>) -> Self {
        let id = target.id();
        TARGET_STACK.with(|stack| stack.borrow_mut().push(Some(target)));
        Self { target: Some(id) }
    }

    /// Suspend tracking until the guard is dropped.
    pub fn enter_untracked() -> Self {
        TARGET_STACK.with(|stack| stack.borrow_mut().push(None));
        Self { target: None }
    }

    /// Run `f` with no active target.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _ctx = Self::enter_untracked();
        f()
    }

    /// Check if a watcher is currently collecting dependencies.
    pub fn is_active() -> bool {
        TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// The watcher currently collecting dependencies, if any.
    pub fn current_target() -> Option<Rc<dyn Subscriber>> {
        TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// The ID of the active watcher, if any.
    pub fn current_id() -> Option<WatcherId> {
        TARGET_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(|target| target.id()))
        })
    }

    /// Number of evaluations currently nested on this thread.
    pub fn depth() -> usize {
        TARGET_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let _ = TARGET_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                let popped_id = entry.map(|target| target.id());
                debug_assert_eq!(
                    popped_id, self.target,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.target, popped_id
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Dep;
    use crate::Result;

    struct Probe {
        id: WatcherId,
    }

    impl Probe {
        fn new() -> Rc<Self> {
            Rc::new(Self { id: WatcherId::new() })
        }
    }

    impl Subscriber for Probe {
        fn id(&self) -> WatcherId {
            self.id
        }

        fn expression(&self) -> &str {
            "probe"
        }

        fn add_dep(&self, _dep: &Rc<Dep>) {}

        fn update(&self) {}

        fn run(&self) -> Result<()> {
            Ok(())
        }

        fn is_active(&self) -> bool {
            true
        }
    }

    #[test]
    fn context_tracks_target() {
        let probe = Probe::new();
        let id = probe.id;

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_id().is_none());

        {
            let _ctx = ReactiveContext::enter(probe);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_id(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn nested_contexts_restore_previous_target() {
        let outer = Probe::new();
        let inner = Probe::new();
        let (outer_id, inner_id) = (outer.id, inner.id);

        {
            let _ctx1 = ReactiveContext::enter(outer);
            assert_eq!(ReactiveContext::current_id(), Some(outer_id));

            {
                let _ctx2 = ReactiveContext::enter(inner);
                assert_eq!(ReactiveContext::current_id(), Some(inner_id));
                assert_eq!(ReactiveContext::depth(), 2);
            }

            assert_eq!(ReactiveContext::current_id(), Some(outer_id));
        }

        assert!(ReactiveContext::current_id().is_none());
    }

    #[test]
    fn untracked_hides_enclosing_target() {
        let _ctx = ReactiveContext::enter(Probe::new());

        let seen = ReactiveContext::untracked(ReactiveContext::is_active);
        assert!(!seen);
        assert!(ReactiveContext::is_active());
    }

    #[test]
    fn target_is_restored_after_panic() {
        let outer = Probe::new();
        let outer_id = outer.id;
        let _ctx = ReactiveContext::enter(outer);

        let result = std::panic::catch_unwind(|| {
            let _inner = ReactiveContext::enter(Probe::new());
            panic!("evaluator blew up");
        });

        assert!(result.is_err());
        assert_eq!(ReactiveContext::current_id(), Some(outer_id));
    }
}
