//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{CategoryKind, DishStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub sort_order: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishRecord {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    /// Monetary amount in minor units; never floating point.
    pub price_cents: i64,
    pub image: Option<String>,
    pub description: Option<String>,
    pub status: DishStatus,
    pub sort_order: i32,
    pub deleted: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishFlavorRecord {
    pub id: Uuid,
    pub dish_id: Uuid,
    pub name: String,
    /// Serialized list of choice labels, stored opaque.
    pub options_json: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Read model joining a dish with its category name and flavor variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishWithFlavors {
    #[serde(flatten)]
    pub dish: DishRecord,
    pub category_name: String,
    pub flavors: Vec<DishFlavorRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub payload_text: Option<String>,
    pub created_at: OffsetDateTime,
}
