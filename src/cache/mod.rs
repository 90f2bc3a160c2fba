//! In-process cache for read-heavy menu queries.
//!
//! Write paths publish typed events; a consumer drains them, drops the
//! affected entries and re-warms the hot reads from the database.

pub mod config;
pub mod consumer;
pub mod events;
pub mod keys;
mod lock;
pub mod planner;
pub mod store;
pub mod trigger;

pub use config::CacheConfig;
pub use consumer::CacheConsumer;
pub use events::{CacheEvent, EventKind, EventQueue};
pub use keys::{EntityKey, MenuListKey};
pub use store::CacheStore;
pub use trigger::CacheTrigger;

use std::sync::Arc;

/// Cache handles shared with read paths.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<CacheStore>,
    pub trigger: Arc<CacheTrigger>,
}
