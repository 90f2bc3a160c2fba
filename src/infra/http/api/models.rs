use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::{CategoryKind, DishStatus};

fn default_dish_status() -> DishStatus {
    DishStatus::OnSale
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryCreateRequest {
    pub name: String,
    pub kind: CategoryKind,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub kind: Option<CategoryKind>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySelectorQuery {
    pub kind: Option<CategoryKind>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DishFlavorRequest {
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DishCreateRequest {
    pub category_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub price_cents: i64,
    pub image: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_dish_status")]
    pub status: DishStatus,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub flavors: Vec<DishFlavorRequest>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DishUpdateRequest {
    pub category_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub price_cents: i64,
    pub image: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_dish_status")]
    pub status: DishStatus,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub flavors: Vec<DishFlavorRequest>,
}

#[derive(Debug, Deserialize)]
pub struct DishListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub category_id: Uuid,
    #[serde(default = "default_dish_status")]
    pub status: DishStatus,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DishStatusRequest {
    pub ids: Vec<Uuid>,
    pub status: DishStatus,
}

/// Batch delete takes its ids as a comma-separated query value.
#[derive(Debug, Deserialize)]
pub struct DishDeleteQuery {
    pub ids: String,
}

#[derive(Debug, Serialize)]
pub struct BatchChangeResponse {
    pub changed: u64,
}

#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    pub limit: Option<u32>,
}
