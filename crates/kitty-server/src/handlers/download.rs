//! Workbook and sheet downloads

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
};
use tracing::info;

use crate::{AppError, AppState};
use kitty_core::{sheet_csv, Sheet};

/// GET /download - The workbook file
pub async fn download_store(
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, AppError> {
    // Hold the pipeline so no persist is in flight while the file is read
    let _pipeline = state.ctx.pipeline().await;

    let path = state.ctx.store_path();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found("Workbook not found"));
        }
        Err(e) => return Err(e.into()),
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("kitty.db");
    info!(bytes = bytes.len(), "Serving workbook download");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/vnd.sqlite3")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::internal(&e.to_string()))
}

/// GET /download/:sheet - One sheet as CSV
pub async fn download_sheet(
    State(state): State<Arc<AppState>>,
    Path(sheet): Path<String>,
) -> Result<Response<Body>, AppError> {
    let sheet: Sheet = sheet
        .parse()
        .map_err(|_| AppError::not_found("Unknown sheet (use messages, monthly or individual)"))?;

    let csv = {
        let pipeline = state.ctx.pipeline().await;
        sheet_csv(pipeline.ledger(), sheet)?
    };
    info!(
        sheet = %sheet,
        rows = csv.lines().count().saturating_sub(1),
        "Serving sheet export"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", sheet.file_name()),
        )
        .body(Body::from(csv))
        .map_err(|e| AppError::internal(&e.to_string()))
}
