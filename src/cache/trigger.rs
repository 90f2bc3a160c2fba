//! Cache trigger service.
//!
//! High-level API for publishing cache events from write paths and
//! optionally consuming them immediately.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::config::CacheConfig;
use super::consumer::CacheConsumer;
use super::events::{EventKind, EventQueue};

pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, consumer: Arc<CacheConsumer>) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event and optionally consume immediately.
    ///
    /// Write paths consume immediately so a follow-up read never sees a
    /// stale list; the background interval drains anything left over.
    pub async fn trigger(&self, kind: EventKind, consume_now: bool) {
        if !self.config.is_enabled() {
            debug!(event_kind = ?kind, "Cache trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.consumer.consume().await;
        }
    }

    pub async fn category_upserted(&self, category_id: Uuid) {
        self.trigger(EventKind::CategoryUpserted { category_id }, true)
            .await;
    }

    pub async fn category_deleted(&self, category_id: Uuid) {
        self.trigger(EventKind::CategoryDeleted { category_id }, true)
            .await;
    }

    pub async fn dish_upserted(&self, dish_id: Uuid, category_id: Uuid) {
        self.trigger(
            EventKind::DishUpserted {
                dish_id,
                category_id,
            },
            true,
        )
        .await;
    }

    pub async fn dishes_status_changed(&self, dish_ids: Vec<Uuid>) {
        self.trigger(EventKind::DishesStatusChanged { dish_ids }, true)
            .await;
    }

    pub async fn dishes_deleted(&self, dish_ids: Vec<Uuid>) {
        self.trigger(EventKind::DishesDeleted { dish_ids }, true)
            .await;
    }

    pub async fn warmup_on_startup(&self) {
        self.trigger(EventKind::WarmupOnStartup, true).await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &Arc<CacheConsumer> {
        &self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::CacheStore;

    fn create_trigger(config: CacheConfig) -> CacheTrigger {
        let store = Arc::new(CacheStore::new(&config));
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(CacheConsumer::detached(
            config.clone(),
            store,
            queue.clone(),
        ));

        CacheTrigger::new(config, queue, consumer)
    }

    #[tokio::test]
    async fn trigger_publishes_event() {
        let trigger = create_trigger(CacheConfig::default());

        assert!(trigger.queue.is_empty());

        trigger
            .trigger(EventKind::WarmupOnStartup, false)
            .await;

        // Published but not consumed.
        assert_eq!(trigger.queue.len(), 1);
    }

    #[tokio::test]
    async fn trigger_respects_disabled_config() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let trigger = create_trigger(config);

        trigger.dish_upserted(Uuid::nil(), Uuid::nil()).await;

        assert!(trigger.queue.is_empty());
    }

    #[tokio::test]
    async fn convenience_methods_consume_immediately() {
        let trigger = create_trigger(CacheConfig::default());

        trigger.category_upserted(Uuid::nil()).await;
        trigger.category_deleted(Uuid::nil()).await;
        trigger.dish_upserted(Uuid::nil(), Uuid::nil()).await;
        trigger.dishes_status_changed(vec![Uuid::nil()]).await;
        trigger.dishes_deleted(vec![Uuid::nil()]).await;
        trigger.warmup_on_startup().await;

        assert!(trigger.queue.is_empty());
    }
}
