pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/v1/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/api/v1/categories/all", get(handlers::list_all_categories))
        .route(
            "/api/v1/categories/{id}",
            patch(handlers::update_category).delete(handlers::delete_category),
        )
        .route(
            "/api/v1/dishes",
            get(handlers::list_dishes)
                .post(handlers::create_dish)
                .delete(handlers::delete_dishes),
        )
        .route("/api/v1/dishes/menu", get(handlers::menu))
        .route("/api/v1/dishes/status", post(handlers::update_dish_status))
        .route(
            "/api/v1/dishes/{id}",
            get(handlers::get_dish).patch(handlers::update_dish),
        )
        .route("/api/v1/audit", get(handlers::list_audit_logs))
        .route("/healthz", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
