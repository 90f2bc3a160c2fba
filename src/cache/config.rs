//! Cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_DISH_LIMIT: usize = 500;
const DEFAULT_MENU_LIST_LIMIT: usize = 100;
const DEFAULT_AUTO_CONSUME_INTERVAL_MS: u64 = 5000;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the object/query cache.
    pub enabled: bool,
    /// Maximum dishes in the by-id KV cache.
    pub dish_limit: usize,
    /// Maximum menu list entries, one per `(category, status)` pair.
    pub menu_list_limit: usize,
    /// Auto-consume interval (ms) for eventual consistency.
    pub auto_consume_interval_ms: u64,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dish_limit: DEFAULT_DISH_LIMIT,
            menu_list_limit: DEFAULT_MENU_LIST_LIMIT,
            auto_consume_interval_ms: DEFAULT_AUTO_CONSUME_INTERVAL_MS,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            dish_limit: settings.dish_limit,
            menu_list_limit: settings.menu_list_limit,
            auto_consume_interval_ms: settings.auto_consume_interval_ms,
            consume_batch_limit: settings.consume_batch_limit,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the dish limit as NonZeroUsize, clamping to 1 if zero.
    pub fn dish_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.dish_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the menu list limit as NonZeroUsize, clamping to 1 if zero.
    pub fn menu_list_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.menu_list_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
