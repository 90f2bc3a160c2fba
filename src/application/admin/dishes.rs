use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CategoriesRepo, CreateDishParams, DishListRecord, DishQueryFilter, DishesRepo, DishesWriteRepo,
    FlavorInput, FlavorsRepo, RepoError, UpdateDishParams,
};
use crate::cache::{CacheState, MenuListKey};
use crate::domain::entities::DishWithFlavors;
use crate::domain::types::DishStatus;

const METRIC_MENU_HIT: &str = "comanda_cache_menu_hit_total";
const METRIC_MENU_MISS: &str = "comanda_cache_menu_miss_total";
const METRIC_DISH_HIT: &str = "comanda_cache_dish_hit_total";
const METRIC_DISH_MISS: &str = "comanda_cache_dish_miss_total";

#[derive(Debug, Error)]
pub enum AdminDishError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("dish name `{name}` already exists")]
    DuplicateName { name: String },
    #[error("dish references an unknown category")]
    UnknownCategory,
    #[error("dish not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// One flavor variant as submitted with a dish, e.g. spiciness with its
/// choice labels.
#[derive(Debug, Clone)]
pub struct FlavorCommand {
    pub name: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CreateDishCommand {
    pub category_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub price_cents: i64,
    pub image: Option<String>,
    pub description: Option<String>,
    pub status: DishStatus,
    pub sort_order: i32,
    pub flavors: Vec<FlavorCommand>,
}

#[derive(Debug, Clone)]
pub struct UpdateDishCommand {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub price_cents: i64,
    pub image: Option<String>,
    pub description: Option<String>,
    pub status: DishStatus,
    pub sort_order: i32,
    pub flavors: Vec<FlavorCommand>,
}

#[derive(Clone)]
pub struct AdminDishService {
    reader: Arc<dyn DishesRepo>,
    writer: Arc<dyn DishesWriteRepo>,
    flavors: Arc<dyn FlavorsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    audit: AdminAuditService,
    cache: Option<CacheState>,
}

impl AdminDishService {
    pub fn new(
        reader: Arc<dyn DishesRepo>,
        writer: Arc<dyn DishesWriteRepo>,
        flavors: Arc<dyn FlavorsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        audit: AdminAuditService,
    ) -> Self {
        Self {
            reader,
            writer,
            flavors,
            categories,
            audit,
            cache: None,
        }
    }

    /// Attach cache handles to this service (optional).
    pub fn with_cache_opt(mut self, cache: Option<CacheState>) -> Self {
        self.cache = cache;
        self
    }

    pub async fn page(
        &self,
        filter: &DishQueryFilter,
        page: PageRequest,
    ) -> Result<Page<DishListRecord>, AdminDishError> {
        self.reader
            .list_page(filter, page)
            .await
            .map_err(AdminDishError::from)
    }

    /// Fetch one dish with its category name and flavors, read through
    /// the by-id cache.
    pub async fn get_with_flavors(&self, id: Uuid) -> Result<DishWithFlavors, AdminDishError> {
        if let Some(cache) = self.enabled_cache() {
            if let Some(dish) = cache.store.get_dish(id) {
                counter!(METRIC_DISH_HIT).increment(1);
                return Ok(dish);
            }
            counter!(METRIC_DISH_MISS).increment(1);
        }

        let dish = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(AdminDishError::NotFound)?;

        let category = self
            .categories
            .find_by_id(dish.category_id)
            .await?
            .ok_or_else(|| {
                RepoError::Integrity {
                    message: format!("dish `{}` references missing category", dish.id),
                }
            })?;

        let flavors = self.flavors.list_flavors(dish.id).await?;

        let assembled = DishWithFlavors {
            dish,
            category_name: category.name,
            flavors,
        };

        if let Some(cache) = self.enabled_cache() {
            cache.store.set_dish(assembled.clone());
        }

        Ok(assembled)
    }

    /// Menu listing for one category and sale status, read through the
    /// menu list cache.
    pub async fn menu(
        &self,
        category_id: Uuid,
        status: DishStatus,
    ) -> Result<Vec<DishWithFlavors>, AdminDishError> {
        let key = MenuListKey {
            category_id,
            status,
        };

        if let Some(cache) = self.enabled_cache() {
            if let Some(list) = cache.store.get_menu_list(&key) {
                counter!(METRIC_MENU_HIT).increment(1);
                return Ok(list);
            }
            counter!(METRIC_MENU_MISS).increment(1);
        }

        let list = self.reader.list_for_menu(category_id, status).await?;

        if let Some(cache) = self.enabled_cache() {
            cache.store.set_menu_list(key, list.clone());
        }

        Ok(list)
    }

    pub async fn create_dish(
        &self,
        actor: &str,
        command: CreateDishCommand,
    ) -> Result<DishWithFlavors, AdminDishError> {
        let name = command.name.trim().to_string();
        ensure_non_empty(&name, "name")?;
        ensure_non_negative_price(command.price_cents)?;
        let flavor_inputs = flavor_inputs(&command.flavors)?;

        if self
            .categories
            .find_by_id(command.category_id)
            .await?
            .is_none()
        {
            return Err(AdminDishError::UnknownCategory);
        }

        if self.reader.find_by_name(&name).await?.is_some() {
            return Err(AdminDishError::DuplicateName { name });
        }

        let params = CreateDishParams {
            category_id: command.category_id,
            name,
            code: command.code,
            price_cents: command.price_cents,
            image: command.image,
            description: command.description,
            status: command.status,
            sort_order: command.sort_order,
        };

        let dish = self
            .writer
            .create_dish(params, &flavor_inputs)
            .await
            .map_err(map_duplicate)?;

        let snapshot = DishSnapshot {
            name: dish.name.as_str(),
            category_id: dish.category_id,
            price_cents: dish.price_cents,
            status: dish.status,
        };
        self.audit
            .record(
                actor,
                "dish.create",
                "dish",
                Some(&dish.id.to_string()),
                Some(&snapshot),
            )
            .await?;

        if let Some(cache) = &self.cache {
            cache.trigger.dish_upserted(dish.id, dish.category_id).await;
        }

        self.get_with_flavors(dish.id).await
    }

    pub async fn update_dish(
        &self,
        actor: &str,
        command: UpdateDishCommand,
    ) -> Result<DishWithFlavors, AdminDishError> {
        let name = command.name.trim().to_string();
        ensure_non_empty(&name, "name")?;
        ensure_non_negative_price(command.price_cents)?;
        let flavor_inputs = flavor_inputs(&command.flavors)?;

        let existing = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(AdminDishError::NotFound)?;

        if self
            .categories
            .find_by_id(command.category_id)
            .await?
            .is_none()
        {
            return Err(AdminDishError::UnknownCategory);
        }

        if let Some(other) = self.reader.find_by_name(&name).await? {
            if other.id != existing.id {
                return Err(AdminDishError::DuplicateName { name });
            }
        }

        let params = UpdateDishParams {
            id: existing.id,
            category_id: command.category_id,
            name,
            code: command.code,
            price_cents: command.price_cents,
            image: command.image,
            description: command.description,
            status: command.status,
            sort_order: command.sort_order,
        };

        let dish = self
            .writer
            .update_dish(params, &flavor_inputs)
            .await
            .map_err(map_duplicate)?;

        let snapshot = DishSnapshot {
            name: dish.name.as_str(),
            category_id: dish.category_id,
            price_cents: dish.price_cents,
            status: dish.status,
        };
        self.audit
            .record(
                actor,
                "dish.update",
                "dish",
                Some(&dish.id.to_string()),
                Some(&snapshot),
            )
            .await?;

        if let Some(cache) = &self.cache {
            cache.trigger.dish_upserted(dish.id, dish.category_id).await;
        }

        self.get_with_flavors(dish.id).await
    }

    /// Change sale status for a batch of dishes. Returns the number of
    /// rows changed.
    pub async fn update_status(
        &self,
        actor: &str,
        ids: Vec<Uuid>,
        status: DishStatus,
    ) -> Result<u64, AdminDishError> {
        if ids.is_empty() {
            return Err(AdminDishError::ConstraintViolation("ids"));
        }

        let changed = self.writer.update_status(&ids, status).await?;

        let snapshot = BatchSnapshot {
            ids: &ids,
            status: Some(status),
        };
        self.audit
            .record(actor, "dish.status", "dish", None, Some(&snapshot))
            .await?;

        if let Some(cache) = &self.cache {
            cache.trigger.dishes_status_changed(ids).await;
        }

        Ok(changed)
    }

    /// Logically delete a batch of dishes. Returns the number of rows
    /// changed.
    pub async fn delete(&self, actor: &str, ids: Vec<Uuid>) -> Result<u64, AdminDishError> {
        if ids.is_empty() {
            return Err(AdminDishError::ConstraintViolation("ids"));
        }

        let changed = self.writer.mark_deleted(&ids).await?;

        let snapshot = BatchSnapshot {
            ids: &ids,
            status: None,
        };
        self.audit
            .record(actor, "dish.delete", "dish", None, Some(&snapshot))
            .await?;

        if let Some(cache) = &self.cache {
            cache.trigger.dishes_deleted(ids).await;
        }

        Ok(changed)
    }

    fn enabled_cache(&self) -> Option<&CacheState> {
        self.cache
            .as_ref()
            .filter(|cache| cache.config.is_enabled())
    }
}

#[derive(Debug, Serialize)]
struct DishSnapshot<'a> {
    name: &'a str,
    category_id: Uuid,
    price_cents: i64,
    status: DishStatus,
}

#[derive(Debug, Serialize)]
struct BatchSnapshot<'a> {
    ids: &'a [Uuid],
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<DishStatus>,
}

fn flavor_inputs(flavors: &[FlavorCommand]) -> Result<Vec<FlavorInput>, AdminDishError> {
    let mut inputs = Vec::with_capacity(flavors.len());
    for flavor in flavors {
        let name = flavor.name.trim();
        if name.is_empty() {
            return Err(AdminDishError::ConstraintViolation("flavor name"));
        }
        let options_json =
            serde_json::to_string(&flavor.options).map_err(RepoError::from_persistence)?;
        inputs.push(FlavorInput {
            name: name.to_string(),
            options_json,
        });
    }
    Ok(inputs)
}

fn map_duplicate(err: RepoError) -> AdminDishError {
    match err {
        RepoError::Duplicate { constraint } => AdminDishError::DuplicateName { name: constraint },
        other => AdminDishError::Repo(other),
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminDishError> {
    if value.trim().is_empty() {
        return Err(AdminDishError::ConstraintViolation(field));
    }
    Ok(())
}

fn ensure_non_negative_price(price_cents: i64) -> Result<(), AdminDishError> {
    if price_cents < 0 {
        return Err(AdminDishError::ConstraintViolation("price_cents"));
    }
    Ok(())
}
