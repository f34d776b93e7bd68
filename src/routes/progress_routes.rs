//! HTTP routes for chapter completion
//!
//! - POST /api/progress/{chapterId}/complete - Mark a chapter completed
//!
//! Completion goes through the sequence gate: the previous chapter (by
//! sequence order) must already be completed, and re-completing a finished
//! chapter succeeds idempotently.

use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::Role;
use crate::progress::ProgressRecord;
use crate::routes::{
    authenticate, authorize, cors_preflight, error_response, get_auth_header, json_response,
    BoxBody, ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub message: String,
    pub progress: ProgressRecord,
}

/// POST /api/progress/{chapterId}/complete
async fn handle_complete(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    chapter_id: &str,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(resp) = authorize(&claims, &[Role::Student]) {
        return resp;
    }

    let gate = match &state.sequence_gate {
        Some(g) => g,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse {
                    error: "Database not available".into(),
                    code: Some("DB_UNAVAILABLE".into()),
                },
            )
        }
    };

    match gate.complete(&claims.sub, chapter_id).await {
        Ok(progress) => {
            info!("Chapter {} completed by {}", chapter_id, claims.email);
            json_response(
                StatusCode::OK,
                &CompletionResponse {
                    message: "Chapter marked as completed".into(),
                    progress,
                },
            )
        }
        Err(e) => error_response(&e),
    }
}

/// Handle progress-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None if not a progress route.
pub async fn handle_progress_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if !path.starts_with("/api/progress") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(&path);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    // segments = ["api", "progress", ...]
    let response = match (&method, &segments[2..]) {
        (&Method::POST, [chapter_id, "complete"]) => {
            handle_complete(req, state, chapter_id).await
        }

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Progress endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
