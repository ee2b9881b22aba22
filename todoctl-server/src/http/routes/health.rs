//! Liveness probe

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

const HEALTHY: Health = Health {
    status: "ok",
    version: env!("CARGO_PKG_VERSION"),
};

/// `GET /health`: answers without touching storage.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(|| async { Json(HEALTHY) }))
}
