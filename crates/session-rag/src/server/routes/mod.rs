//! API routes

pub mod documents;
pub mod ingest;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;
use crate::types::HealthReport;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Document management
        .route(
            "/documents",
            get(documents::list_documents).delete(documents::clear_documents),
        )
        .route(
            "/documents/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
        // Ingestion
        .route(
            "/ingest",
            post(ingest::ingest_text).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/upload",
            post(ingest::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Query
        .route("/query", post(query::query))
        // Info
        .route("/stats", get(documents::stats))
        .route("/info", get(info))
}

/// GET /api/info - collaborator health, chunking settings and counters
async fn info(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.pipeline().health().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::server::RagServer;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn server() -> RagServer {
        let mut config = RagConfig::default();
        config.chunking.chunk_size = 200;
        config.chunking.chunk_overlap = 20;
        RagServer::new(config).unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = server()
            .build_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ingest_query_delete() {
        let server = server();

        let (status, body) = send(
            server.build_router(),
            post_json(
                "/api/ingest",
                serde_json::json!({
                    "filename": "team.txt",
                    "text": "The team meets every Monday at 10am in room 4."
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "indexed");
        let id = body["document_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            server.build_router(),
            post_json("/api/query", serde_json::json!({ "question": "When does the team meet?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["citations"][0]["document_id"], id.as_str());

        let (status, _) = send(
            server.build_router(),
            Request::delete(format!("/api/documents/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            server.build_router(),
            Request::get(format!("/api/documents/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_query_rejects_zero_top_k() {
        let (status, body) = send(
            server().build_router(),
            post_json("/api/query", serde_json::json!({ "question": "anything", "top_k": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_failed_ingest_is_unprocessable() {
        let (status, body) = send(
            server().build_router(),
            post_json(
                "/api/ingest",
                serde_json::json!({ "filename": "blank.txt", "text": "   " }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], "failed");
    }

    #[tokio::test]
    async fn test_stats_start_empty() {
        let (status, body) = send(
            server().build_router(),
            Request::get("/api/stats").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document_count"], 0);
        assert_eq!(body["index_size"], 0);
    }
}
