//! Runtime Configuration
//!
//! Tunables for the scheduler. A [`Config`] is installed per thread through
//! [`Runtime::configure`](crate::reactive::Runtime::configure); every field
//! has a default so partial JSON documents are accepted.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default bound on how many times one watcher may run within a single flush.
pub const DEFAULT_MAX_UPDATE_COUNT: usize = 100;

/// When queued watchers are flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Flush on the next tick (see [`crate::scheduler::next_tick`]).
    #[default]
    Async,

    /// Flush inline as soon as the first watcher is queued.
    Sync,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runs allowed per watcher per flush before the flush is aborted as a
    /// circular update.
    pub max_update_count: usize,

    /// When queued watchers are flushed.
    pub flush_mode: FlushMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_update_count: DEFAULT_MAX_UPDATE_COUNT,
            flush_mode: FlushMode::Async,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}
