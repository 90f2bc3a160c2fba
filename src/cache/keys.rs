//! Cache key definitions.

use uuid::Uuid;

use crate::domain::types::DishStatus;

/// Identifies a cached entity or derived collection for invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// The full category listing.
    CategoryList,
    /// A dish (with flavors) identified by its database id.
    Dish(Uuid),
    /// Every cached menu list, regardless of key. Any dish mutation
    /// invalidates the whole family.
    MenuLists,
}

/// Key of one cached menu listing, the analogue of the legacy
/// `dish_{category}_{status}` cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuListKey {
    pub category_id: Uuid,
    pub status: DishStatus,
}
