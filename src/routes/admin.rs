//! Admin API endpoints for account management
//!
//! ## Endpoints
//!
//! - `GET   /api/admin/mentors/pending`        - Mentors awaiting approval
//! - `PATCH /api/admin/mentors/{id}/approve`   - Approve a mentor
//! - `POST  /api/admin/mentors`                - Create an auto-approved mentor
//! - `GET   /api/admin/users`                  - List non-admin accounts
//!
//! All endpoints require the admin role.

use bson::{doc, oid::ObjectId};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, Role};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::routes::{
    authenticate, authorize, cors_preflight, error_response, get_auth_header, json_response,
    parse_json_body, require_mongo, BoxBody, ErrorResponse, SuccessResponse,
};
use crate::server::AppState;
use crate::types::LecternError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateMentorRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListEntry {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub is_approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<UserDoc> for UserListEntry {
    fn from(doc: UserDoc) -> Self {
        Self {
            id: doc.id_hex(),
            created_at: doc
                .metadata
                .created_at
                .and_then(|dt| dt.try_to_rfc3339_string().ok()),
            email: doc.email,
            role: doc.role,
            is_approved: doc.is_approved,
        }
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /api/admin/mentors/pending
async fn handle_pending_mentors(state: Arc<AppState>) -> Response<BoxBody> {
    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match collection
        .find_many(doc! { "role": "mentor", "is_approved": false })
        .await
    {
        Ok(users) => {
            let entries: Vec<UserListEntry> = users.into_iter().map(UserListEntry::from).collect();
            json_response(StatusCode::OK, &entries)
        }
        Err(e) => error_response(&e),
    }
}

/// PATCH /api/admin/mentors/{id}/approve
async fn handle_approve_mentor(state: Arc<AppState>, user_id: &str) -> Response<BoxBody> {
    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let Ok(oid) = ObjectId::parse_str(user_id) else {
        return error_response(&LecternError::NotFound("User"));
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match collection
        .update_one(
            doc! { "_id": oid },
            doc! { "$set": { "is_approved": true, "metadata.updated_at": bson::DateTime::now() } },
        )
        .await
    {
        Ok(result) if result.matched_count == 0 => {
            error_response(&LecternError::NotFound("User"))
        }
        Ok(_) => {
            info!("Mentor approved: {}", user_id);
            json_response(
                StatusCode::OK,
                &SuccessResponse {
                    success: true,
                    message: "Mentor approved successfully".into(),
                },
            )
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/admin/mentors
///
/// Admin-created mentors skip the approval queue.
async fn handle_create_mentor(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: CreateMentorRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.email.is_empty() || !body.email.contains('@') {
        return error_response(&LecternError::Validation("A valid email is required".into()));
    }
    if body.password.len() < 8 {
        return error_response(&LecternError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match collection.find_one(doc! { "email": &body.email }).await {
        Ok(Some(_)) => {
            return error_response(&LecternError::Conflict(
                "An account with this email already exists".into(),
            ))
        }
        Ok(None) => {}
        Err(e) => return error_response(&e),
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => return error_response(&e),
    };

    let mentor = UserDoc::new(body.email.clone(), password_hash, Role::Mentor, true);

    match collection.insert_one(mentor).await {
        Ok(_) => {
            info!("Mentor created by admin: {}", body.email);
            json_response(
                StatusCode::CREATED,
                &SuccessResponse {
                    success: true,
                    message: "Mentor created successfully".into(),
                },
            )
        }
        Err(e) => {
            let error_str = e.to_string();
            if error_str.contains("duplicate key") || error_str.contains("E11000") {
                return error_response(&LecternError::Conflict(
                    "An account with this email already exists".into(),
                ));
            }
            error_response(&e)
        }
    }
}

/// GET /api/admin/users
async fn handle_list_users(state: Arc<AppState>) -> Response<BoxBody> {
    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match collection
        .find_many_sorted(
            doc! { "role": { "$ne": "admin" } },
            doc! { "metadata.created_at": -1 },
        )
        .await
    {
        Ok(users) => {
            let entries: Vec<UserListEntry> = users.into_iter().map(UserListEntry::from).collect();
            json_response(StatusCode::OK, &entries)
        }
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle admin HTTP requests.
///
/// Returns Some(response) if the request was handled, None if not an admin route.
pub async fn handle_admin_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if !path.starts_with("/api/admin") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    // All admin routes require the admin role up front
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return Some(resp),
    };
    if let Err(resp) = authorize(&claims, &[Role::Admin]) {
        return Some(resp);
    }

    let path = path.split('?').next().unwrap_or(&path);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    // segments = ["api", "admin", ...]
    let response = match (&method, &segments[2..]) {
        (&Method::GET, ["mentors", "pending"]) => handle_pending_mentors(state).await,
        (&Method::PATCH, ["mentors", user_id, "approve"]) => {
            handle_approve_mentor(state, user_id).await
        }
        (&Method::POST, ["mentors"]) => handle_create_mentor(req, state).await,
        (&Method::GET, ["users"]) => handle_list_users(state).await,

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Admin endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
