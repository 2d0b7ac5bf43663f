//! Visit counter endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::{CounterRepo, GlobalVisitCounter};
use crate::http::error::ApiError;
use crate::http::server::AppState;

/// Counter response
#[derive(Debug, Serialize)]
pub struct CounterResponse {
    pub id: i32,
    pub total_geral_visitas: u64,
    pub ultima_atualizacao: String,
}

impl From<GlobalVisitCounter> for CounterResponse {
    fn from(c: GlobalVisitCounter) -> Self {
        Self {
            id: c.id,
            total_geral_visitas: c.total_count,
            ultima_atualizacao: c.last_updated.to_rfc3339(),
        }
    }
}

/// Track visit response
#[derive(Debug, Serialize)]
pub struct TrackVisitResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub counter: CounterResponse,
}

/// POST /api/track-visit - record one visit
async fn track_visit(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrackVisitResponse>, ApiError> {
    let counter = CounterRepo::new(&state.pool)
        .increment()
        .await
        .map_err(|e| state.store_error("track visit", e))?;

    Ok(Json(TrackVisitResponse {
        message: "Global visit counter updated",
        counter: CounterResponse::from(counter),
    }))
}

/// GET /api/statistics - current counter
async fn statistics(State(state): State<Arc<AppState>>) -> Result<Json<CounterResponse>, ApiError> {
    let counter = CounterRepo::new(&state.pool)
        .read()
        .await
        .map_err(|e| state.store_error("read statistics", e))?;

    Ok(Json(CounterResponse::from(counter)))
}

/// Visit routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/track-visit", post(track_visit))
        .route("/api/statistics", get(statistics))
}
