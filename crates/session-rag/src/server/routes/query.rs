//! Query endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{Answer, QueryRequest};

/// POST /api/query - answer a question from the session's documents
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Answer>> {
    tracing::info!("Query: \"{}\"", request.question);
    let answer = state.pipeline().query_request(&request).await?;
    Ok(Json(answer))
}
