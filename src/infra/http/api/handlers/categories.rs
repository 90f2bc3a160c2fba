//! Category handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::admin::categories::{CreateCategoryCommand, UpdateCategoryCommand};
use crate::application::pagination::{DEFAULT_PAGE_SIZE, PageRequest};
use crate::application::repos::CategoryQueryFilter;

use super::category_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    CategoryCreateRequest, CategoryListQuery, CategorySelectorQuery, CategoryUpdateRequest,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_categories(
    State(state): State<ApiState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    let filter = CategoryQueryFilter {
        kind: query.kind,
        search: query.search,
    };

    let result = state
        .categories
        .list(&filter, page)
        .await
        .map_err(category_to_api)?;

    Ok(Json(result))
}

pub async fn list_all_categories(
    State(state): State<ApiState>,
    Query(query): Query<CategorySelectorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .categories
        .list_all(query.kind)
        .await
        .map_err(category_to_api)?;

    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<CategoryCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = ApiState::actor_label(&headers);

    let command = CreateCategoryCommand {
        name: payload.name,
        kind: payload.kind,
        sort_order: payload.sort_order,
    };

    let category = state
        .categories
        .create_category(&actor, command)
        .await
        .map_err(category_to_api)?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = ApiState::actor_label(&headers);

    let command = UpdateCategoryCommand {
        id,
        name: payload.name,
        sort_order: payload.sort_order,
    };

    let category = state
        .categories
        .update_category(&actor, command)
        .await
        .map_err(category_to_api)?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = ApiState::actor_label(&headers);

    state
        .categories
        .delete_category(&actor, id)
        .await
        .map_err(category_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
