//! Trellis Core
//!
//! This crate provides a fine-grained reactive engine: plain data is made
//! observable, computations discover what they read while they run, and
//! changes re-run exactly the computations that depend on them, batched once
//! per tick.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observer`: reactive values, objects and arrays
//! - `reactive`: deps, watchers, computed values and the watch API
//! - `scheduler`: the deduplicating flush queue and the tick driver
//! - `props`: prop resolution and validation
//! - `config` / `error`: runtime configuration and the crate error type
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use trellis_core::{reactive, run_until_idle, Watcher};
//!
//! // Make some data reactive
//! let state = reactive(json!({ "count": 1 }));
//! let obj = state.as_object().unwrap().clone();
//!
//! // A watcher that reads it
//! let reader = obj.clone();
//! let render = Watcher::new(move || {
//!     println!("count is {}", reader.get("count").unwrap_or_default());
//!     Ok(())
//! })?;
//!
//! // Writes are batched until the next tick
//! obj.set("count", 2);
//! obj.set("count", 3);
//! run_until_idle(); // prints "count is 3" once
//! ```
//!
//! # Threading
//!
//! Everything is single-threaded. Engine state is thread-local and handles
//! are `Rc`-based, so they cannot cross threads.

pub mod config;
pub mod error;
pub mod observer;
pub mod props;
pub mod reactive;
pub mod scheduler;

pub use config::{Config, FlushMode};
pub use error::{ReactiveError, Result};
pub use observer::{
    observe, reactive, should_convert, with_conversion, ConversionGuard, Observer,
    ReactiveArray, ReactiveObject, Value,
};
pub use props::{validate_prop, PropOptions, PropType};
pub use reactive::{
    watch, watch_path, Computed, Dep, ReactiveContext, Runtime, WatchHandle, WatchOptions,
    WatchValue, Watcher, WatcherId, WatcherOptions,
};
pub use scheduler::{next_tick, run_tick, run_until_idle, tick};
