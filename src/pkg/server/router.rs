use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{patch, post};
use axum::{Router, routing::get};

use super::handlers;
use super::handlers::auth::{login, me, register};
use super::handlers::probes::{healthz, livez};
use super::middlewares::authn;
use super::state::AppState;
use crate::conf::settings;
use crate::prelude::Result;

/// Attachments of one job post share a request, so the body may carry a few
/// files at the per-file limit.
const FILES_PER_REQUEST: usize = 5;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users/me", get(me))
        .route("/api/jobs", post(handlers::jobs::create))
        .route("/api/jobs/mine", get(handlers::jobs::mine))
        .route("/api/jobs/{id}/status", patch(handlers::jobs::set_status))
        .route("/api/bids", post(handlers::bids::create))
        .route("/api/upload", post(handlers::upload::document))
        .route("/chat/{jobId}", post(handlers::chat::post))
        .route("/api/messages/message", post(handlers::messages::create))
        .layer(from_fn_with_state(state.clone(), authn::authenticate))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/jobs/fetch", get(handlers::jobs::fetch))
        .route("/api/jobs/{id}", get(handlers::jobs::get_by_id))
        .route("/api/bids/job/{jobId}", get(handlers::bids::for_job))
        .route("/chat/{jobId}", get(handlers::chat::history))
        .route("/api/messages/message", get(handlers::messages::list))
        .route("/ws", get(handlers::chat::ws))
        .route("/healthz", get(healthz))
        .route("/livez", get(livez))
        .layer(DefaultBodyLimit::max(
            settings.max_upload_bytes * FILES_PER_REQUEST,
        ))
        .with_state(state)
}

pub async fn build_routes() -> Result<Router> {
    let state = AppState::new().await?;
    Ok(router(state))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use super::*;

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let app = build_routes().await.unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[traced_test]
    #[tokio::test]
    async fn test_livez() {
        let (status, _) = call(Request::get("/livez").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_malformed_job_id() {
        let (status, body) =
            call(Request::get("/api/jobs/not-an-id").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Resource not found");
        assert_eq!(body["errors"]["id"], "Invalid _id");
    }

    #[traced_test]
    #[tokio::test]
    async fn test_malformed_bid_job_id() {
        let (status, body) =
            call(Request::get("/api/bids/job/123").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["id"], "Invalid jobId");
    }

    #[traced_test]
    #[tokio::test]
    async fn test_post_job_requires_token() {
        let (status, body) = call(Request::post("/api/jobs").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authorized, no token");
    }

    #[traced_test]
    #[tokio::test]
    async fn test_garbage_token() {
        let request = Request::post("/api/bids")
            .header(AUTHORIZATION, "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
        assert!(body["errors"]["token"].is_string());
    }
}
