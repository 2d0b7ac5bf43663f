//! Root banner endpoint

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct BannerResponse {
    pub message: &'static str,
}

/// GET /
async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Portfolio visit counter API is running",
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(banner))
}
