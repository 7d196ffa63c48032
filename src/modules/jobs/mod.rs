use crate::config::settings::MAX_UPLOAD_BYTES;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;

pub mod dto;
pub mod handler;
pub mod model;
pub mod planner;
pub mod service;
pub mod store;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/process-video", post(handler::process_video))
        .route("/status/{id}", get(handler::job_status))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
}
