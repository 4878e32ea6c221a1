use axum::Json;
use axum::extract::State;
use axum::{Router, routing::get};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct DbStateResponse {
    pub rtt: u128,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/db", get(health_db))
}

#[utoipa::path(
    get,
    path = "/health/db",
    tag = "health",
    responses(
        (status = 200, description = "Database connection status", body = DbStateResponse),
        (status = 500, description = "Database connection failed")
    )
)]
pub async fn health_db(State(state): State<AppState>) -> Result<Json<DbStateResponse>, ApiError> {
    let now = Instant::now();
    state.db.ping().await?;
    let elapsed = now.elapsed();
    Ok(Json(DbStateResponse {
        rtt: elapsed.as_millis(),
    }))
}
