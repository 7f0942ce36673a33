//! Document management endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DocumentListResponse, DocumentSummary, IndexStats};

/// GET /api/documents
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    Json(DocumentListResponse::new(state.pipeline().documents()))
}

/// GET /api/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentSummary>> {
    state
        .pipeline()
        .document(id)
        .map(Json)
        .ok_or(Error::DocumentNotFound(id))
}

/// DELETE /api/documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if state.pipeline().delete(id).await {
        Ok(Json(serde_json::json!({ "deleted": true, "document_id": id })))
    } else {
        Err(Error::DocumentNotFound(id))
    }
}

/// DELETE /api/documents - remove every document from the session
pub async fn clear_documents(State(state): State<AppState>) -> Json<serde_json::Value> {
    let removed = state.pipeline().clear().await;
    Json(serde_json::json!({ "deleted": removed }))
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.pipeline().stats())
}
