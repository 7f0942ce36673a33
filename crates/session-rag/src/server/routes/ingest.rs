//! Ingestion endpoints

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::time::Instant;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{ContentType, DocumentStatus, IngestRequest, IngestResponse};

/// POST /api/ingest - ingest already-extracted text
pub async fn ingest_text(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> (StatusCode, Json<IngestResponse>) {
    let start = Instant::now();
    let status = state.pipeline().ingest(request).await;
    respond(status, start)
}

/// POST /api/upload - extract text from an uploaded file, then ingest it.
///
/// Multipart fields: `file` (required) and `document_id` (optional, to replace
/// an existing document).
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestResponse>)> {
    let start = Instant::now();
    let mut document_id = None;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_argument(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "document_id" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| Error::invalid_argument(format!("Failed to read document_id: {}", e)))?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|e| Error::invalid_argument(format!("Invalid document_id: {}", e)))?;
                document_id = Some(id);
            }
            _ => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("upload_{}.txt", Uuid::new_v4()));
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::invalid_argument(format!("Failed to read file: {}", e)))?;
                upload = Some((filename, data));
            }
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| Error::invalid_argument("multipart body has no file"))?;
    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    let content_type = ContentType::from_filename(&filename);
    let text = state.extractor().extract(&filename, content_type, &data)?;

    let mut request = IngestRequest::new(filename, text).with_content_type(content_type);
    if let Some(id) = document_id {
        request = request.with_id(id);
    }

    let status = state.pipeline().ingest(request).await;
    Ok(respond(status, start))
}

fn respond(status: DocumentStatus, start: Instant) -> (StatusCode, Json<IngestResponse>) {
    let code = if status.is_indexed() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    let processing_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    (
        code,
        Json(IngestResponse {
            status,
            processing_time_ms,
        }),
    )
}
