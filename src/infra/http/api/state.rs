use std::sync::Arc;

use axum::http::HeaderMap;

use crate::application::admin::audit::AdminAuditService;
use crate::application::admin::categories::AdminCategoryService;
use crate::application::admin::dishes::AdminDishService;
use crate::application::repos::HealthRepo;

#[derive(Clone)]
pub struct ApiState {
    pub categories: Arc<AdminCategoryService>,
    pub dishes: Arc<AdminDishService>,
    pub audit: Arc<AdminAuditService>,
    pub health: Arc<dyn HealthRepo>,
}

impl ApiState {
    /// Actor label for the audit trail. The API sits behind the
    /// operator's boundary; the optional `x-operator` header names who
    /// acted.
    pub fn actor_label(headers: &HeaderMap) -> String {
        headers
            .get("x-operator")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| format!("operator:{value}"))
            .unwrap_or_else(|| "operator:unknown".to_string())
    }
}
