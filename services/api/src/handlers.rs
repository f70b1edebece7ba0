//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests against the
//! sculpture dataset. It uses `utoipa` doc comments to generate OpenAPI
//! documentation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::{
    models::{ErrorResponse, GeneralInfo, SculptureRecord, SearchCriteria},
    state::AppState,
};

pub enum ApiError {
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(error) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let error = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { error }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Get the general information about the gallery collection.
#[utoipa::path(
    get,
    path = "/api/general/gallery",
    responses(
        (status = 200, description = "Gallery collection information", body = GeneralInfo),
        (status = 404, description = "Dataset not loaded", body = ErrorResponse)
    )
)]
pub async fn get_gallery_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GeneralInfo>, ApiError> {
    state
        .dataset
        .gallery_info()
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Gallery information not found".to_string()))
}

/// Get the general information about the gothic style.
#[utoipa::path(
    get,
    path = "/api/general/gothic",
    responses(
        (status = 200, description = "Gothic style information", body = GeneralInfo),
        (status = 404, description = "Dataset not loaded", body = ErrorResponse)
    )
)]
pub async fn get_gothic_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GeneralInfo>, ApiError> {
    state
        .dataset
        .gothic_style_info()
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Gothic style information not found".to_string()))
}

/// Search sculptures by optional criteria.
///
/// Without any criteria the result is an empty list, never the whole dataset.
#[utoipa::path(
    get,
    path = "/api/sculptures",
    params(SearchCriteria),
    responses(
        (status = 200, description = "Matching sculptures", body = [SculptureRecord])
    )
)]
pub async fn search_sculptures(
    State(state): State<Arc<AppState>>,
    Query(criteria): Query<SearchCriteria>,
) -> Json<Vec<SculptureRecord>> {
    let results = state
        .dataset
        .search(&criteria)
        .into_iter()
        .cloned()
        .collect();
    Json(results)
}

/// Get a single sculpture by name.
#[utoipa::path(
    get,
    path = "/api/sculptures/{name}",
    params(
        ("name" = String, Path, description = "Sculpture name, exact or approximate")
    ),
    responses(
        (status = 200, description = "The best-matching sculpture", body = SculptureRecord),
        (status = 404, description = "No sculpture matches", body = ErrorResponse)
    )
)]
pub async fn get_sculpture(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<SculptureRecord>, ApiError> {
    state
        .dataset
        .get_by_name(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Sculpture not found".to_string()))
}
