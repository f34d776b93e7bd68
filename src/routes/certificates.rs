//! HTTP routes for certificate eligibility
//!
//! - GET /api/certificates/{courseId}/eligibility
//!
//! Returns the certificate gate's decision plus supporting counts. The
//! downloadable artifact itself is produced by an external document
//! renderer that consumes this decision.

use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Role;
use crate::progress::Eligibility;
use crate::routes::{
    authenticate, authorize, cors_preflight, error_response, get_auth_header, json_response,
    BoxBody, ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResponse {
    pub course_id: String,
    pub student_id: String,
    #[serde(flatten)]
    pub decision: Eligibility,
    pub checked_at: String,
}

/// GET /api/certificates/{courseId}/eligibility
async fn handle_eligibility(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    course_id: &str,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(resp) = authorize(&claims, &[Role::Student]) {
        return resp;
    }

    let gate = match &state.certificate_gate {
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

    match gate.report(&claims.sub, course_id).await {
        Ok(decision) => json_response(
            StatusCode::OK,
            &EligibilityResponse {
                course_id: course_id.to_string(),
                student_id: claims.sub,
                decision,
                checked_at: chrono::Utc::now().to_rfc3339(),
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// Handle certificate-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None if not a certificate route.
pub async fn handle_certificate_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if !path.starts_with("/api/certificates") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(&path);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    // segments = ["api", "certificates", ...]
    let response = match (&method, &segments[2..]) {
        (&Method::GET, [course_id, "eligibility"]) => {
            handle_eligibility(req, state, course_id).await
        }

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Certificate endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
