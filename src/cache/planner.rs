//! Consumption planning.
//!
//! Folds a batch of cache events into the set of entries to drop and the
//! reads worth re-warming, so duplicate events in one batch cost one
//! invalidation.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use super::events::{CacheEvent, EventKind};
use super::keys::EntityKey;

#[derive(Debug, Default)]
pub struct ConsumptionPlan {
    pub invalidate_entities: HashSet<EntityKey>,
    /// Re-load the full category listing after invalidation.
    pub warm_category_list: bool,
    /// Categories whose on-sale menu list should be re-warmed.
    pub warm_menu_categories: HashSet<Uuid>,
}

impl ConsumptionPlan {
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();

        for event in events {
            match event.kind {
                EventKind::CategoryUpserted { .. } | EventKind::CategoryDeleted { .. } => {
                    plan.invalidate_entities.insert(EntityKey::CategoryList);
                    // Menu lists embed the category name, so category
                    // changes invalidate them too.
                    plan.invalidate_entities.insert(EntityKey::MenuLists);
                    plan.warm_category_list = true;
                }
                EventKind::DishUpserted {
                    dish_id,
                    category_id,
                } => {
                    plan.invalidate_entities.insert(EntityKey::Dish(dish_id));
                    plan.invalidate_entities.insert(EntityKey::MenuLists);
                    plan.warm_menu_categories.insert(category_id);
                }
                EventKind::DishesStatusChanged { dish_ids }
                | EventKind::DishesDeleted { dish_ids } => {
                    for dish_id in dish_ids {
                        plan.invalidate_entities.insert(EntityKey::Dish(dish_id));
                    }
                    plan.invalidate_entities.insert(EntityKey::MenuLists);
                }
                EventKind::WarmupOnStartup => {
                    plan.warm_category_list = true;
                }
            }
        }

        plan
    }

    pub fn has_invalidations(&self) -> bool {
        !self.invalidate_entities.is_empty()
    }

    pub fn has_warm_actions(&self) -> bool {
        self.warm_category_list || !self.warm_menu_categories.is_empty()
    }
}

impl fmt::Display for ConsumptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalidate={} warm_category_list={} warm_menus={}",
            self.invalidate_entities.len(),
            self.warm_category_list,
            self.warm_menu_categories.len()
        )
    }
}
