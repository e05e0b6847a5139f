//! State synchronization between one robot and its MQTT topics.
//!
//! ```text
//! <root>/+/set ──► handle_message ──► Robot command ──► refresh
//!                                                          │
//! timer tick ──────────────────────────────────────────► refresh
//!                                                          │
//!                  get_robot_state ─► map_state ─► StateCache::swap_changes
//!                                                          │
//!                                              Publisher (changed topics only)
//! ```
//!
//! The startup publish sends every topic once and seeds the [`StateCache`];
//! afterwards only values that differ from the cache are published.

pub mod cache;
pub mod router;
pub mod scheduler;
pub mod topic_map;

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

pub use cache::StateCache;
pub use router::Command;
pub use topic_map::{StateField, TopicMap, diff, map_state};

/// Bridge service states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Bridges one robot to the topics under `root`.
pub struct Bridge<R, P> {
    root: String,
    robot: R,
    publisher: P,
    cache: StateCache,
    refresh_interval: Duration,
    lifecycle: Mutex<Lifecycle>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<R, P> Bridge<R, P> {
    pub fn new(root: impl Into<String>, robot: R, publisher: P, refresh_interval: Duration) -> Self {
        Self {
            root: root.into(),
            robot,
            publisher,
            cache: StateCache::new(),
            refresh_interval,
            lifecycle: Mutex::new(Lifecycle::Stopped),
            timer: Mutex::new(None),
        }
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }
}
