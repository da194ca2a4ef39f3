use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::aggregator::{Aggregator, ScoreRequestError};
use crate::stats::{ScoreSnapshot, SCORE_STATS};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct WalletScoreRequest {
    pub wallet_address: String,
}

pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(error) => {
                SCORE_STATS.inc_rejected(1);
                (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response()
            }
            ApiError::Internal(detail) => {
                SCORE_STATS.inc_internal_errors(1);
                tracing::error!("score request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error",
                        "message": "Failed to compute wallet score",
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<ScoreRequestError> for ApiError {
    fn from(err: ScoreRequestError) -> Self {
        match err {
            ScoreRequestError::InvalidWallet(e) => ApiError::BadRequest(e.to_string()),
            ScoreRequestError::Internal(e) => ApiError::Internal(e.to_string()),
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn stats() -> Json<ScoreSnapshot> {
    Json(SCORE_STATS.snapshot())
}

async fn score_wallet(state: &AppState, wallet: &str) -> Result<Json<i64>, ApiError> {
    let report = AssertUnwindSafe(state.aggregator.score(wallet))
        .catch_unwind()
        .await
        .map_err(|panic| ApiError::Internal(panic_message(panic.as_ref())))??;
    SCORE_STATS.inc_scored(1);
    Ok(Json(report.result.score))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "score computation panicked".to_string())
}

async fn get_wallet_score(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<Json<i64>, ApiError> {
    score_wallet(&state, &wallet_address).await
}

async fn post_wallet_score(
    State(state): State<AppState>,
    body: Result<Json<WalletScoreRequest>, JsonRejection>,
) -> Result<Json<i64>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    score_wallet(&state, &request.wallet_address).await
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/wallet-score", post(post_wallet_score))
        .route("/wallet-score/:wallet_address", get(get_wallet_score))
        .with_state(state)
}

pub async fn run_http_server(addr: &str, state: AppState) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
