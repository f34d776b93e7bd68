//! HTTP routes for chapters
//!
//! Chapter creation is owner-only; the listing runs through the sequence
//! gate so every chapter comes back annotated with the caller's completion
//! and lock state.

use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::Role;
use crate::db::schemas::{ChapterDoc, CHAPTER_COLLECTION};
use crate::progress::Chapter;
use crate::routes::courses::require_owned_course;
use crate::routes::{
    authenticate, authorize, error_response, get_auth_header, json_response, parse_json_body,
    require_mongo, BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::types::LecternError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateChapterRequest {
    pub title: String,
    pub video_url: String,
    pub sequence_order: i32,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedChapterResponse {
    pub message: String,
    pub chapter: Chapter,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/courses/{id}/chapters
pub async fn handle_create_chapter(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    course_id: &str,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(resp) = authorize(&claims, &[Role::Mentor, Role::Admin]) {
        return resp;
    }

    let body: CreateChapterRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.title.trim().len() < 3 {
        return error_response(&LecternError::Validation(
            "Title must be at least 3 characters".into(),
        ));
    }
    if !body.video_url.starts_with("http://") && !body.video_url.starts_with("https://") {
        return error_response(&LecternError::Validation(
            "video_url must be a valid URL".into(),
        ));
    }
    if body.sequence_order < 1 {
        return error_response(&LecternError::Validation(
            "sequence_order must be a positive integer".into(),
        ));
    }

    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_owned_course(mongo, course_id, &claims).await {
        return resp;
    }

    let collection = match mongo.collection::<ChapterDoc>(CHAPTER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let mut chapter = ChapterDoc::new(
        course_id.to_string(),
        body.title.trim().to_string(),
        body.video_url,
        body.sequence_order,
    );

    match collection.insert_one(chapter.clone()).await {
        Ok(id) => {
            info!(
                "Chapter created: {} (order {}) in course {}",
                chapter.title, chapter.sequence_order, course_id
            );
            chapter._id = Some(id);
            json_response(
                StatusCode::CREATED,
                &CreatedChapterResponse {
                    message: "Chapter created".into(),
                    chapter: Chapter::from(chapter),
                },
            )
        }
        Err(e) => {
            // The unique (course_id, sequence_order) index rejects duplicates
            let error_str = e.to_string();
            if error_str.contains("duplicate key") || error_str.contains("E11000") {
                return json_response(
                    StatusCode::CONFLICT,
                    &ErrorResponse {
                        error: "A chapter with this sequence number already exists".into(),
                        code: Some("SEQUENCE_TAKEN".into()),
                    },
                );
            }
            error_response(&e)
        }
    }
}

/// GET /api/courses/{id}/chapters
///
/// Ordered chapters annotated with isCompleted/isLocked for the caller.
/// One incomplete chapter locks everything after it.
pub async fn handle_list_chapters(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    course_id: &str,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(resp) = authorize(&claims, &[Role::Student, Role::Mentor, Role::Admin]) {
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

    match gate.list_with_status(&claims.sub, course_id).await {
        Ok(statuses) => json_response(StatusCode::OK, &statuses),
        Err(e) => error_response(&e),
    }
}
