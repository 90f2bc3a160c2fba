mod categories;
mod dishes;

pub use categories::{
    create_category, delete_category, list_all_categories, list_categories, update_category,
};
pub use dishes::{
    create_dish, delete_dishes, get_dish, list_dishes, menu, update_dish, update_dish_status,
};

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::admin::categories::AdminCategoryError;
use crate::application::admin::dishes::AdminDishError;
use crate::application::repos::RepoError;

use super::error::{ApiError, codes};
use super::models::AuditListQuery;
use super::state::ApiState;

pub async fn health(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    state.health.ping().await.map_err(repo_to_api)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

pub async fn list_audit_logs(
    State(state): State<ApiState>,
    Query(query): Query<AuditListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let records = state.audit.list_recent(limit).await.map_err(repo_to_api)?;
    Ok(Json(records))
}

pub(super) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::Duplicate { constraint } => ApiError::conflict(
            codes::DUPLICATE,
            "duplicate record",
            Some(constraint),
        ),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTEGRITY,
            "integrity error",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "persistence error",
            Some(message),
        ),
    }
}

pub(super) fn category_to_api(err: AdminCategoryError) -> ApiError {
    match err {
        AdminCategoryError::ConstraintViolation(field) => {
            ApiError::bad_request("invalid field", Some(field.to_string()))
        }
        AdminCategoryError::DuplicateName { name } => ApiError::conflict(
            codes::DUPLICATE,
            "category name already exists",
            Some(name),
        ),
        AdminCategoryError::InUse { count } => ApiError::conflict(
            codes::IN_USE,
            "category is still referenced by dishes",
            Some(format!("{count} dishes")),
        ),
        AdminCategoryError::NotFound => ApiError::not_found("category not found"),
        AdminCategoryError::Repo(err) => repo_to_api(err),
    }
}

pub(super) fn dish_to_api(err: AdminDishError) -> ApiError {
    match err {
        AdminDishError::ConstraintViolation(field) => {
            ApiError::bad_request("invalid field", Some(field.to_string()))
        }
        AdminDishError::DuplicateName { name } => {
            ApiError::conflict(codes::DUPLICATE, "dish name already exists", Some(name))
        }
        AdminDishError::UnknownCategory => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::UNKNOWN_CATEGORY,
            "dish references an unknown category",
            None,
        ),
        AdminDishError::NotFound => ApiError::not_found("dish not found"),
        AdminDishError::Repo(err) => repo_to_api(err),
    }
}
