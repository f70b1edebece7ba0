//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{ErrorResponse, GeneralInfo, SculptureRecord, SearchCriteria},
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_gallery_info,
        handlers::get_gothic_info,
        handlers::search_sculptures,
        handlers::get_sculpture,
    ),
    components(schemas(SculptureRecord, GeneralInfo, SearchCriteria, ErrorResponse)),
    tags(
        (name = "Lapidarium API", description = "Sculpture dataset lookups behind the gallery voice guide")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/api/general/gallery", get(handlers::get_gallery_info))
        .route("/api/general/gothic", get(handlers::get_gothic_info))
        .route("/api/sculptures", get(handlers::search_sculptures))
        .route("/api/sculptures/{name}", get(handlers::get_sculpture))
        .route("/realtime", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI routes.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
