use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_api_key;
use crate::dto::{ErrorResponse, HealthResponse, WhisperItem, WhisperRequest, WhisperResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/whisper", post(whisper))
        .route("/v1/speech/{key}/{index}", get(speech))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Whisper
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/whisper",
    request_body = WhisperRequest,
    responses(
        (status = 200, description = "Summaries with speech links", body = WhisperResponse),
        (status = 400, description = "Bad query or article URL", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Keyword search found nothing", body = ErrorResponse),
        (status = 502, description = "Inference job failed", body = ErrorResponse),
        (status = 504, description = "Upstream timed out", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "whisper"
)]
pub async fn whisper(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<WhisperRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = body.query.trim();
    if query.is_empty() {
        let body = ErrorResponse::new("bad_input", "Query must not be empty");
        return Ok((StatusCode::BAD_REQUEST, axum::Json(body)).into_response());
    }

    let (key, results) = state
        .cache
        .get_or_run(query, state.pipeline.as_ref())
        .await?;

    let response = WhisperResponse {
        results: results
            .iter()
            .enumerate()
            .map(|(index, result)| WhisperItem::new(&key, index, result))
            .collect(),
        key,
    };

    Ok(axum::Json(response).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/speech/{key}/{index}",
    params(
        ("key" = String, Path, description = "Cache key returned by /v1/whisper"),
        ("index" = usize, Path, description = "Zero-based result index"),
    ),
    responses(
        (status = 200, description = "WAV audio", body = Vec<u8>, content_type = "audio/wav"),
        (status = 404, description = "Not cached or out of range", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "whisper"
)]
pub async fn speech(
    State(state): State<Arc<AppState>>,
    Path((key, index)): Path<(String, usize)>,
) -> impl IntoResponse {
    let clip = state
        .cache
        .get(&key)
        .await
        .and_then(|results| results.get(index).map(|r| r.speech.clone()));

    match clip {
        Some(bytes) => ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response(),
        None => {
            let body = ErrorResponse::new(
                "not_found",
                format!("No cached speech for {key}/{index}"),
            );
            (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
