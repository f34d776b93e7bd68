//! HTTP routes for Lectern

pub mod admin;
pub mod auth_routes;
pub mod certificates;
pub mod chapters;
pub mod courses;
pub mod health;
pub mod progress_routes;

pub use admin::handle_admin_request;
pub use auth_routes::handle_auth_request;
pub use certificates::handle_certificate_request;
pub use courses::handle_course_request;
pub use health::{health_check, readiness_check, version_info};
pub use progress_routes::handle_progress_request;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_token_from_header, Claims, JwtValidator, Role};
use crate::db::MongoClient;
use crate::server::AppState;
use crate::types::LecternError;

pub(crate) type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Error payload returned for every failure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Generic success payload
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Response Helpers
// =============================================================================

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PATCH, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

pub(crate) fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PATCH, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub(crate) fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Map a service error onto the HTTP taxonomy
pub(crate) fn error_response(err: &LecternError) -> Response<BoxBody> {
    let (status, code) = match err {
        LecternError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        LecternError::SequenceViolation => (StatusCode::BAD_REQUEST, "SEQUENCE_VIOLATION"),
        LecternError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        LecternError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        LecternError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        LecternError::Http(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        LecternError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    json_response(
        status,
        &ErrorResponse {
            error: err.to_string(),
            code: Some(code.to_string()),
        },
    )
}

// =============================================================================
// Request Helpers
// =============================================================================

pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
    max_bytes: usize,
) -> Result<T, LecternError> {
    let body = req
        .collect()
        .await
        .map_err(|e| LecternError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > max_bytes {
        return Err(LecternError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| LecternError::Http(format!("Invalid JSON: {}", e)))
}

pub(crate) fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<String> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

// =============================================================================
// Authentication / Authorization Helpers
// =============================================================================

pub(crate) fn get_jwt_validator(state: &AppState) -> Result<JwtValidator, Response<BoxBody>> {
    if state.args.dev_mode {
        Ok(JwtValidator::new_dev())
    } else {
        match &state.args.jwt_secret {
            Some(secret) => {
                JwtValidator::new(secret.clone(), state.args.jwt_expiry_seconds).map_err(|e| {
                    json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &ErrorResponse {
                            error: format!("JWT configuration error: {}", e),
                            code: Some("CONFIG_ERROR".into()),
                        },
                    )
                })
            }
            None => Err(json_response(
                StatusCode::NOT_IMPLEMENTED,
                &ErrorResponse {
                    error: "Authentication not enabled (missing JWT_SECRET)".into(),
                    code: Some("NOT_ENABLED".into()),
                },
            )),
        }
    }
}

/// Verify the bearer token and return the caller's identity
pub(crate) fn authenticate(
    state: &AppState,
    auth_header: Option<&str>,
) -> Result<Claims, Response<BoxBody>> {
    let token = match extract_token_from_header(auth_header) {
        Some(t) => t,
        None => {
            return Err(json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "Access denied: no token provided".into(),
                    code: Some("NO_TOKEN".into()),
                },
            ))
        }
    };

    let jwt = get_jwt_validator(state)?;
    let result = jwt.verify_token(token);
    if !result.valid {
        return Err(json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: result
                    .error
                    .unwrap_or_else(|| "Invalid or expired token".into()),
                code: Some("INVALID_TOKEN".into()),
            },
        ));
    }

    Ok(result.claims.expect("valid result carries claims"))
}

/// Require the caller to hold one of the allowed roles
pub(crate) fn authorize(claims: &Claims, allowed: &[Role]) -> Result<(), Response<BoxBody>> {
    if claims.role.is_one_of(allowed) {
        Ok(())
    } else {
        Err(json_response(
            StatusCode::FORBIDDEN,
            &ErrorResponse {
                error: "Forbidden: insufficient permissions".into(),
                code: Some("FORBIDDEN".into()),
            },
        ))
    }
}

/// Require a database connection (absent only in dev mode)
pub(crate) fn require_mongo(state: &AppState) -> Result<&MongoClient, Response<BoxBody>> {
    state.mongo.as_ref().ok_or_else(|| {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &ErrorResponse {
                error: "Database not available".into(),
                code: Some("DB_UNAVAILABLE".into()),
            },
        )
    })
}
