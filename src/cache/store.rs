//! Cache storage.
//!
//! Holds the full category listing as a singleton slot, dishes (with
//! flavors) by id, and menu lists keyed by `(category, status)`. The
//! LRU caches bound memory by entry count; explicit event-driven
//! invalidation does the correctness work.

use std::sync::RwLock;

use lru::LruCache;
use uuid::Uuid;

use crate::domain::entities::{CategoryRecord, DishWithFlavors};

use super::config::CacheConfig;
use super::keys::MenuListKey;
use super::lock::rw_write;

const SOURCE: &str = "cache::store";

pub struct CacheStore {
    // Singleton (no eviction needed)
    categories: RwLock<Option<Vec<CategoryRecord>>>,

    // KV caches (with LRU eviction)
    dishes_by_id: RwLock<LruCache<Uuid, DishWithFlavors>>,
    menu_lists: RwLock<LruCache<MenuListKey, Vec<DishWithFlavors>>>,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            categories: RwLock::new(None),
            dishes_by_id: RwLock::new(LruCache::new(config.dish_limit_non_zero())),
            menu_lists: RwLock::new(LruCache::new(config.menu_list_limit_non_zero())),
        }
    }

    // ------------------------------------------------------------------
    // Category listing singleton
    // ------------------------------------------------------------------

    pub fn get_categories(&self) -> Option<Vec<CategoryRecord>> {
        // Write lock everywhere: LruCache::get mutates recency anyway,
        // and the singleton read is cheap.
        rw_write(&self.categories, SOURCE, "get_categories").clone()
    }

    pub fn set_categories(&self, value: Vec<CategoryRecord>) {
        *rw_write(&self.categories, SOURCE, "set_categories") = Some(value);
    }

    pub fn invalidate_categories(&self) {
        *rw_write(&self.categories, SOURCE, "invalidate_categories") = None;
    }

    // ------------------------------------------------------------------
    // Dish KV cache
    // ------------------------------------------------------------------

    pub fn get_dish(&self, id: Uuid) -> Option<DishWithFlavors> {
        rw_write(&self.dishes_by_id, SOURCE, "get_dish")
            .get(&id)
            .cloned()
    }

    pub fn set_dish(&self, dish: DishWithFlavors) {
        rw_write(&self.dishes_by_id, SOURCE, "set_dish").put(dish.dish.id, dish);
    }

    pub fn invalidate_dish(&self, id: Uuid) {
        rw_write(&self.dishes_by_id, SOURCE, "invalidate_dish").pop(&id);
    }

    // ------------------------------------------------------------------
    // Menu list cache
    // ------------------------------------------------------------------

    pub fn get_menu_list(&self, key: &MenuListKey) -> Option<Vec<DishWithFlavors>> {
        rw_write(&self.menu_lists, SOURCE, "get_menu_list")
            .get(key)
            .cloned()
    }

    pub fn set_menu_list(&self, key: MenuListKey, list: Vec<DishWithFlavors>) {
        rw_write(&self.menu_lists, SOURCE, "set_menu_list").put(key, list);
    }

    /// Drop every cached menu list, whatever its key. This is the
    /// pattern-invalidation the legacy deployment did with `dish_*`.
    pub fn invalidate_all_menu_lists(&self) {
        rw_write(&self.menu_lists, SOURCE, "invalidate_all_menu_lists").clear();
    }

    pub fn menu_list_len(&self) -> usize {
        rw_write(&self.menu_lists, SOURCE, "menu_list_len").len()
    }

    /// Clear all cached data.
    pub fn clear(&self) {
        self.invalidate_categories();
        rw_write(&self.dishes_by_id, SOURCE, "clear.dishes_by_id").clear();
        rw_write(&self.menu_lists, SOURCE, "clear.menu_lists").clear();
    }
}
