//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{
    AuditLogRecord, CategoryRecord, DishFlavorRecord, DishRecord, DishWithFlavors,
};
use crate::domain::types::{CategoryKind, DishStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryQueryFilter {
    pub kind: Option<CategoryKind>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DishQueryFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
    pub kind: CategoryKind,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub name: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct CreateDishParams {
    pub category_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub price_cents: i64,
    pub image: Option<String>,
    pub description: Option<String>,
    pub status: DishStatus,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateDishParams {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub price_cents: i64,
    pub image: Option<String>,
    pub description: Option<String>,
    pub status: DishStatus,
    pub sort_order: i32,
}

/// One flavor variant as written alongside its dish.
#[derive(Debug, Clone)]
pub struct FlavorInput {
    pub name: String,
    pub options_json: String,
}

/// Row shape for the admin dish listing, category name joined in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishListRecord {
    #[serde(flatten)]
    pub dish: DishRecord,
    pub category_name: String,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_all(&self, kind: Option<CategoryKind>) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn list_page(
        &self,
        filter: &CategoryQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CategoryRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryRecord>, RepoError>;

    /// Count of live (non-deleted) dishes referencing the category.
    async fn count_dishes(&self, id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(&self, params: CreateCategoryParams)
    -> Result<CategoryRecord, RepoError>;

    async fn update_category(&self, params: UpdateCategoryParams)
    -> Result<CategoryRecord, RepoError>;

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait DishesRepo: Send + Sync {
    async fn list_page(
        &self,
        filter: &DishQueryFilter,
        page: PageRequest,
    ) -> Result<Page<DishListRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DishRecord>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<DishRecord>, RepoError>;

    /// Menu listing for one category and sale status, flavors attached,
    /// ordered `sort_order ASC, updated_at DESC`.
    async fn list_for_menu(
        &self,
        category_id: Uuid,
        status: DishStatus,
    ) -> Result<Vec<DishWithFlavors>, RepoError>;
}

#[async_trait]
pub trait DishesWriteRepo: Send + Sync {
    /// Insert the dish and its flavors inside one transaction.
    async fn create_dish(
        &self,
        params: CreateDishParams,
        flavors: &[FlavorInput],
    ) -> Result<DishRecord, RepoError>;

    /// Update the dish and replace its flavor set wholesale, inside one
    /// transaction.
    async fn update_dish(
        &self,
        params: UpdateDishParams,
        flavors: &[FlavorInput],
    ) -> Result<DishRecord, RepoError>;

    /// Returns the number of rows changed.
    async fn update_status(&self, ids: &[Uuid], status: DishStatus) -> Result<u64, RepoError>;

    /// Logical delete: halts sale and flags the rows, never removes them.
    async fn mark_deleted(&self, ids: &[Uuid]) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait FlavorsRepo: Send + Sync {
    async fn list_flavors(&self, dish_id: Uuid) -> Result<Vec<DishFlavorRecord>, RepoError>;
}

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
