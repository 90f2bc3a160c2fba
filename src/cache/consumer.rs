//! Cache consumer for executing consumption plans.
//!
//! Drains events from the queue, drops the affected entries, then
//! re-warms the hot reads from the database.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{info, instrument, warn};

use crate::application::repos::{CategoriesRepo, DishesRepo};
use crate::domain::types::DishStatus;
use crate::infra::db::PostgresRepositories;

use super::config::CacheConfig;
use super::events::EventQueue;
use super::keys::{EntityKey, MenuListKey};
use super::planner::ConsumptionPlan;
use super::store::CacheStore;

const METRIC_CACHE_CONSUME_MS: &str = "comanda_cache_consume_ms";
const METRIC_CACHE_WARM_MS: &str = "comanda_cache_warm_ms";

pub struct CacheConsumer {
    config: CacheConfig,
    store: Arc<CacheStore>,
    queue: Arc<EventQueue>,
    repos: Option<Arc<PostgresRepositories>>,
}

impl CacheConsumer {
    /// Create a new cache consumer with repository access for warming.
    pub fn new(
        config: CacheConfig,
        store: Arc<CacheStore>,
        queue: Arc<EventQueue>,
        repos: Arc<PostgresRepositories>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            repos: Some(repos),
        }
    }

    /// Create a consumer without repository access; warming is disabled.
    pub fn detached(config: CacheConfig, store: Arc<CacheStore>, queue: Arc<EventQueue>) -> Self {
        Self {
            config,
            store,
            queue,
            repos: None,
        }
    }

    /// Consume pending events and execute the resulting plan.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let consume_started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit);
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let plan = ConsumptionPlan::from_events(events);

        info!(event_count, plan = %plan, "Cache consumption starting");

        if self.config.is_enabled() && plan.has_invalidations() {
            self.invalidate(&plan);
        }

        if self.config.is_enabled() && plan.has_warm_actions() {
            self.warm(&plan).await;
        }

        info!(
            event_count,
            invalidated = plan.invalidate_entities.len(),
            "Cache consumption complete"
        );

        histogram!(METRIC_CACHE_CONSUME_MS)
            .record(consume_started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    fn invalidate(&self, plan: &ConsumptionPlan) {
        for entity in &plan.invalidate_entities {
            match entity {
                EntityKey::CategoryList => self.store.invalidate_categories(),
                EntityKey::Dish(id) => self.store.invalidate_dish(*id),
                EntityKey::MenuLists => self.store.invalidate_all_menu_lists(),
            }
        }
    }

    async fn warm(&self, plan: &ConsumptionPlan) {
        let Some(repos) = self.repos.as_ref() else {
            return;
        };
        let warm_started_at = Instant::now();

        if plan.warm_category_list {
            match repos.list_all(None).await {
                Ok(categories) => self.store.set_categories(categories),
                Err(error) => warn!(error = %error, "category list warm failed"),
            }
        }

        for category_id in &plan.warm_menu_categories {
            match repos.list_for_menu(*category_id, DishStatus::OnSale).await {
                Ok(list) => self.store.set_menu_list(
                    MenuListKey {
                        category_id: *category_id,
                        status: DishStatus::OnSale,
                    },
                    list,
                ),
                Err(error) => {
                    warn!(error = %error, category_id = %category_id, "menu list warm failed");
                }
            }
        }

        histogram!(METRIC_CACHE_WARM_MS).record(warm_started_at.elapsed().as_secs_f64() * 1000.0);
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::cache::events::EventKind;
    use crate::domain::types::DishStatus as Status;

    use super::super::store::tests::sample_dish;
    use super::*;

    fn detached_consumer() -> (Arc<CacheStore>, Arc<EventQueue>, CacheConsumer) {
        let config = CacheConfig::default();
        let store = Arc::new(CacheStore::new(&config));
        let queue = Arc::new(EventQueue::new());
        let consumer = CacheConsumer::detached(config, store.clone(), queue.clone());
        (store, queue, consumer)
    }

    #[tokio::test]
    async fn consume_on_empty_queue_is_a_no_op() {
        let (_, _, consumer) = detached_consumer();
        assert!(!consumer.consume().await);
    }

    #[tokio::test]
    async fn dish_event_drops_dish_and_menu_lists() {
        let (store, queue, consumer) = detached_consumer();

        let category_id = Uuid::new_v4();
        let dish = sample_dish(Uuid::new_v4(), category_id, "mapo tofu");
        let dish_id = dish.dish.id;
        store.set_dish(dish.clone());
        store.set_menu_list(
            MenuListKey {
                category_id,
                status: Status::OnSale,
            },
            vec![dish],
        );

        queue.publish(EventKind::DishUpserted {
            dish_id,
            category_id,
        });

        assert!(consumer.consume().await);
        assert!(queue.is_empty());
        assert!(store.get_dish(dish_id).is_none());
        assert_eq!(store.menu_list_len(), 0);
    }

    #[tokio::test]
    async fn category_event_drops_category_list() {
        let (store, queue, consumer) = detached_consumer();

        store.set_categories(Vec::new());
        queue.publish(EventKind::CategoryDeleted {
            category_id: Uuid::new_v4(),
        });

        assert!(consumer.consume().await);
        assert!(store.get_categories().is_none());
    }
}
