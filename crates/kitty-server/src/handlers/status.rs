//! Liveness, health and summary handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::{AppError, AppState};
use kitty_core::Summary;

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub connected: bool,
    pub endpoints: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
    pub connected: bool,
}

/// GET / - Service overview
pub async fn index(State(state): State<Arc<AppState>>) -> Json<IndexResponse> {
    Json(IndexResponse {
        service: "kitty",
        status: "running",
        connected: state.ctx.is_connected(),
        endpoints: vec![
            "/health",
            "/api/summary",
            "/download",
            "/download/messages",
            "/download/monthly",
            "/download/individual",
        ],
    })
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "kitty spending tracker is running",
        timestamp: Utc::now().to_rfc3339(),
        connected: state.ctx.is_connected(),
    })
}

/// GET /api/summary - Current spending summary
pub async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<Summary>, AppError> {
    state
        .ctx
        .summary()
        .map(Json)
        .ok_or_else(|| AppError::not_found("No spending data yet"))
}
