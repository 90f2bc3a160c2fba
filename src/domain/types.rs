//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "category_kind", rename_all = "snake_case")]
pub enum CategoryKind {
    Dish,
    Combo,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Dish => "dish",
            CategoryKind::Combo => "combo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "dish_status", rename_all = "snake_case")]
pub enum DishStatus {
    OnSale,
    Halted,
}

impl DishStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DishStatus::OnSale => "on_sale",
            DishStatus::Halted => "halted",
        }
    }
}
