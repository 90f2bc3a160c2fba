//! Dish handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::admin::dishes::{CreateDishCommand, FlavorCommand, UpdateDishCommand};
use crate::application::pagination::{DEFAULT_PAGE_SIZE, PageRequest};
use crate::application::repos::DishQueryFilter;

use super::dish_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    BatchChangeResponse, DishCreateRequest, DishDeleteQuery, DishFlavorRequest, DishListQuery,
    DishStatusRequest, DishUpdateRequest, MenuQuery,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_dishes(
    State(state): State<ApiState>,
    Query(query): Query<DishListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    let filter = DishQueryFilter {
        category_id: query.category_id,
        search: query.search,
    };

    let result = state.dishes.page(&filter, page).await.map_err(dish_to_api)?;

    Ok(Json(result))
}

/// The cached customer-facing read: dishes of one category in one sale
/// status, flavors attached.
pub async fn menu(
    State(state): State<ApiState>,
    Query(query): Query<MenuQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let list = state
        .dishes
        .menu(query.category_id, query.status)
        .await
        .map_err(dish_to_api)?;

    Ok(Json(list))
}

pub async fn get_dish(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let dish = state
        .dishes
        .get_with_flavors(id)
        .await
        .map_err(dish_to_api)?;

    Ok(Json(dish))
}

pub async fn create_dish(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<DishCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = ApiState::actor_label(&headers);

    let command = CreateDishCommand {
        category_id: payload.category_id,
        name: payload.name,
        code: payload.code,
        price_cents: payload.price_cents,
        image: payload.image,
        description: payload.description,
        status: payload.status,
        sort_order: payload.sort_order,
        flavors: flavor_commands(payload.flavors),
    };

    let dish = state
        .dishes
        .create_dish(&actor, command)
        .await
        .map_err(dish_to_api)?;

    Ok((StatusCode::CREATED, Json(dish)))
}

pub async fn update_dish(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<DishUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = ApiState::actor_label(&headers);

    let command = UpdateDishCommand {
        id,
        category_id: payload.category_id,
        name: payload.name,
        code: payload.code,
        price_cents: payload.price_cents,
        image: payload.image,
        description: payload.description,
        status: payload.status,
        sort_order: payload.sort_order,
        flavors: flavor_commands(payload.flavors),
    };

    let dish = state
        .dishes
        .update_dish(&actor, command)
        .await
        .map_err(dish_to_api)?;

    Ok(Json(dish))
}

pub async fn update_dish_status(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<DishStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = ApiState::actor_label(&headers);

    let changed = state
        .dishes
        .update_status(&actor, payload.ids, payload.status)
        .await
        .map_err(dish_to_api)?;

    Ok(Json(BatchChangeResponse { changed }))
}

pub async fn delete_dishes(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<DishDeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = ApiState::actor_label(&headers);
    let ids = parse_ids(&query.ids)?;

    let changed = state
        .dishes
        .delete(&actor, ids)
        .await
        .map_err(dish_to_api)?;

    Ok(Json(BatchChangeResponse { changed }))
}

fn flavor_commands(flavors: Vec<DishFlavorRequest>) -> Vec<FlavorCommand> {
    flavors
        .into_iter()
        .map(|flavor| FlavorCommand {
            name: flavor.name,
            options: flavor.options,
        })
        .collect()
}

/// Parse a comma-separated id list, the transport the legacy delete API
/// used.
fn parse_ids(raw: &str) -> Result<Vec<Uuid>, ApiError> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = Uuid::parse_str(part)
            .map_err(|err| ApiError::bad_request("invalid dish id", Some(err.to_string())))?;
        ids.push(id);
    }

    if ids.is_empty() {
        return Err(ApiError::bad_request("no dish ids supplied", None));
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_accepts_comma_list_with_padding() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!(" {a} , {b} ,");

        let ids = parse_ids(&raw).expect("parse succeeds");
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn parse_ids_rejects_garbage() {
        assert!(parse_ids("not-a-uuid").is_err());
    }

    #[test]
    fn parse_ids_rejects_empty_input() {
        assert!(parse_ids("  , ,").is_err());
    }
}
