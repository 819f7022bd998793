//! Reactive Runtime
//!
//! The runtime is the per-thread coordinator shared by deps, watchers and the
//! scheduler. It holds the active configuration and the host's diagnostic
//! hook, and exposes read-only views of the evaluation context.
//!
//! # Error Reporting
//!
//! Watcher failures that happen during a flush have no caller to return to.
//! They are routed through [`Runtime::report_error`], which emits a
//! structured `tracing` event and then invokes the handler installed with
//! [`Runtime::set_error_handler`], if any.
//!
//! # Thread Safety
//!
//! Everything here is thread-local. Two threads get two independent engines;
//! reactive handles are `!Send`, so state never crosses between them.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::error;

use super::context::ReactiveContext;
use super::subscriber::WatcherId;
use crate::config::Config;
use crate::error::{ReactiveError, Result};

/// Host hook receiving watcher failures: the error and the watcher label.
pub type ErrorHandler = Rc<dyn Fn(&ReactiveError, &str)>;

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
    static ERROR_HANDLER: RefCell<Option<ErrorHandler>> = const { RefCell::new(None) };
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Install `config` for the current thread.
    pub fn configure(config: Config) {
        CONFIG.with(|current| *current.borrow_mut() = config);
    }

    /// The configuration active on the current thread.
    pub fn config() -> Config {
        CONFIG.with(|current| current.borrow().clone())
    }

    /// Route watcher failures to `handler` in addition to the log.
    pub fn set_error_handler<F>(handler: F)
    where
        F: Fn(&ReactiveError, &str) + 'static,
    {
        ERROR_HANDLER.with(|slot| *slot.borrow_mut() = Some(Rc::new(handler)));
    }

    /// Remove the error handler, if one is installed.
    pub fn clear_error_handler() {
        ERROR_HANDLER.with(|slot| slot.borrow_mut().take());
    }

    /// Report a failure that cannot be returned to a caller.
    pub fn report_error(err: &ReactiveError, expression: &str) {
        error!(watcher = expression, error = %err, "error in watcher");

        let handler = ERROR_HANDLER.with(|slot| slot.borrow().clone());
        if let Some(handler) = handler {
            handler(err, expression);
        }
    }

    /// Run `f`, reporting an error or a panic instead of propagating it.
    ///
    /// Returns whether `f` completed. Used wherever reactive code runs on
    /// behalf of a caller that cannot handle the failure: flushes, sync
    /// watchers, tick callbacks and user watch callbacks.
    pub fn guard<F>(expression: &str, f: F) -> bool
    where
        F: FnOnce() -> Result<()>,
    {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                Self::report_error(&err, expression);
                false
            }
            Err(payload) => {
                let err = ReactiveError::Panicked {
                    expression: expression.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                Self::report_error(&err, expression);
                false
            }
        }
    }

    /// The watcher currently collecting dependencies, if any.
    pub fn current_target() -> Option<WatcherId> {
        ReactiveContext::current_id()
    }

    /// Check if reads are currently being tracked.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlushMode;

    #[test]
    fn configure_replaces_thread_config() {
        Runtime::configure(Config {
            max_update_count: 3,
            flush_mode: FlushMode::Sync,
        });
        assert_eq!(Runtime::config().max_update_count, 3);
        assert_eq!(Runtime::config().flush_mode, FlushMode::Sync);

        Runtime::configure(Config::default());
        assert_eq!(Runtime::config(), Config::default());
    }

    #[test]
    fn report_error_reaches_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        Runtime::set_error_handler(move |err, expression| {
            sink.borrow_mut().push(format!("{expression}: {err}"));
        });

        Runtime::report_error(&ReactiveError::evaluation("boom"), "render");
        Runtime::clear_error_handler();
        Runtime::report_error(&ReactiveError::evaluation("ignored"), "render");

        assert_eq!(*seen.borrow(), vec!["render: evaluation failed: boom".to_string()]);
    }

    #[test]
    fn guard_reports_errors_and_panics() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        Runtime::set_error_handler(move |err, expression| {
            sink.borrow_mut().push((expression.to_string(), err.clone()));
        });

        assert!(Runtime::guard("ok", || Ok(())));
        assert!(!Runtime::guard("failing", || Err(ReactiveError::evaluation("nope"))));
        assert!(!Runtime::guard("exploding", || panic!("kaboom")));
        Runtime::clear_error_handler();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("failing".to_string(), ReactiveError::evaluation("nope")));
        assert!(matches!(
            &seen[1],
            (label, ReactiveError::Panicked { message, .. })
                if label == "exploding" && message == "kaboom"
        ));
    }

    #[test]
    fn not_tracking_outside_evaluation() {
        assert!(!Runtime::is_tracking());
        assert!(Runtime::current_target().is_none());
    }
}
