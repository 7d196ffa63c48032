use crate::docs::ApiDoc;
use crate::state::AppState;
use axum::Router;
use axum::http::{HeaderName, header};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower_http::cors::{Any, CorsLayer};

pub fn configure_routes(state: AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static("x-expires-in"),
        ]);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/health",
            axum::routing::get(crate::modules::jobs::handler::health),
        )
        .merge(crate::modules::jobs::router(state))
        .merge(crate::modules::download::router())
        .layer(cors)
}
