//! HTTP routes for courses and enrollment
//!
//! - POST   /api/courses                  - Create a course (mentor/admin)
//! - GET    /api/courses                  - List courses (mentors: own, admins: all)
//! - GET    /api/courses/assigned         - Courses the calling student is enrolled in
//! - GET    /api/courses/{id}             - Course by id
//! - DELETE /api/courses/{id}             - Delete a course (owner or admin)
//! - POST   /api/courses/{id}/enroll      - Enroll a student by email (owner)
//! - POST   /api/courses/{id}/chapters    - Create a chapter (owner)
//! - GET    /api/courses/{id}/chapters    - Chapters with completion/lock state

use bson::{doc, oid::ObjectId};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{Claims, Role};
use crate::db::schemas::{
    CourseDoc, EnrollmentDoc, UserDoc, COURSE_COLLECTION, ENROLLMENT_COLLECTION, USER_COLLECTION,
};
use crate::db::MongoClient;
use crate::routes::{
    authenticate, authorize, chapters, cors_preflight, error_response, get_auth_header,
    json_response, parse_json_body, require_mongo, BoxBody, ErrorResponse, SuccessResponse,
};
use crate::server::AppState;
use crate::types::LecternError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mentor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<CourseDoc> for CourseResponse {
    fn from(doc: CourseDoc) -> Self {
        Self {
            id: doc.id_hex(),
            created_at: doc
                .metadata
                .created_at
                .and_then(|dt| dt.try_to_rfc3339_string().ok()),
            title: doc.title,
            description: doc.description,
            mentor_id: doc.mentor_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCourseResponse {
    pub message: String,
    pub course: CourseResponse,
}

// =============================================================================
// Helpers
// =============================================================================

/// Fetch a course by hex id. A malformed id is a miss, not an error.
async fn find_course(mongo: &MongoClient, course_id: &str) -> Result<Option<CourseDoc>, LecternError> {
    let Ok(oid) = ObjectId::parse_str(course_id) else {
        return Ok(None);
    };

    let collection = mongo.collection::<CourseDoc>(COURSE_COLLECTION).await?;
    collection.find_one(doc! { "_id": oid }).await
}

/// Require the course to exist and the caller to own it (admins pass)
pub(crate) async fn require_owned_course(
    mongo: &MongoClient,
    course_id: &str,
    claims: &Claims,
) -> Result<CourseDoc, Response<BoxBody>> {
    let course = match find_course(mongo, course_id).await {
        Ok(Some(c)) => c,
        Ok(None) => return Err(error_response(&LecternError::NotFound("Course"))),
        Err(e) => return Err(error_response(&e)),
    };

    let is_owner = course.mentor_id == claims.sub;
    let is_admin = claims.role == Role::Admin;
    if !is_owner && !is_admin {
        return Err(json_response(
            StatusCode::FORBIDDEN,
            &ErrorResponse {
                error: "Forbidden: you do not own this course".into(),
                code: Some("FORBIDDEN".into()),
            },
        ));
    }

    Ok(course)
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/courses
async fn handle_create_course(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(resp) = authorize(&claims, &[Role::Mentor, Role::Admin]) {
        return resp;
    }

    let body: CreateCourseRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.title.trim().len() < 3 {
        return error_response(&LecternError::Validation(
            "Title must be at least 3 characters".into(),
        ));
    }

    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let collection = match mongo.collection::<CourseDoc>(COURSE_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let mut course = CourseDoc::new(
        body.title.trim().to_string(),
        body.description,
        claims.sub.clone(),
    );

    match collection.insert_one(course.clone()).await {
        Ok(id) => {
            info!("Course created: {} by {}", course.title, claims.email);
            course._id = Some(id);
            json_response(
                StatusCode::CREATED,
                &CreatedCourseResponse {
                    message: "Course created".into(),
                    course: CourseResponse::from(course),
                },
            )
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/courses
///
/// Mentors see the courses they own; admins see everything.
async fn handle_list_courses(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(resp) = authorize(&claims, &[Role::Mentor, Role::Admin]) {
        return resp;
    }

    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let collection = match mongo.collection::<CourseDoc>(COURSE_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let filter = if claims.role == Role::Mentor {
        doc! { "mentor_id": &claims.sub }
    } else {
        doc! {}
    };

    match collection.find_many(filter).await {
        Ok(courses) => {
            let response: Vec<CourseResponse> =
                courses.into_iter().map(CourseResponse::from).collect();
            json_response(StatusCode::OK, &response)
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/courses/assigned
///
/// Courses the calling student is enrolled in.
async fn handle_assigned_courses(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(resp) = authorize(&claims, &[Role::Student]) {
        return resp;
    }

    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let enrollments = match mongo
        .collection::<EnrollmentDoc>(ENROLLMENT_COLLECTION)
        .await
    {
        Ok(c) => match c.find_many(doc! { "student_id": &claims.sub }).await {
            Ok(e) => e,
            Err(e) => return error_response(&e),
        },
        Err(e) => return error_response(&e),
    };

    let course_ids: Vec<ObjectId> = enrollments
        .iter()
        .filter_map(|e| ObjectId::parse_str(&e.course_id).ok())
        .collect();

    if course_ids.is_empty() {
        return json_response(StatusCode::OK, &Vec::<CourseResponse>::new());
    }

    let collection = match mongo.collection::<CourseDoc>(COURSE_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match collection
        .find_many(doc! { "_id": { "$in": course_ids } })
        .await
    {
        Ok(courses) => {
            let response: Vec<CourseResponse> =
                courses.into_iter().map(CourseResponse::from).collect();
            json_response(StatusCode::OK, &response)
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/courses/{id}
async fn handle_get_course(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    course_id: &str,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    if let Err(resp) = authenticate(&state, auth_header.as_deref()) {
        return resp;
    }

    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    match find_course(mongo, course_id).await {
        Ok(Some(course)) => json_response(StatusCode::OK, &CourseResponse::from(course)),
        Ok(None) => error_response(&LecternError::NotFound("Course")),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/courses/{id}
async fn handle_delete_course(
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

    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let course = match require_owned_course(mongo, course_id, &claims).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let collection = match mongo.collection::<CourseDoc>(COURSE_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match collection
        .soft_delete(doc! { "_id": course._id })
        .await
    {
        Ok(_) => {
            info!("Course deleted: {} by {}", course.title, claims.email);
            json_response(
                StatusCode::OK,
                &SuccessResponse {
                    success: true,
                    message: "Course deleted successfully".into(),
                },
            )
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/courses/{id}/enroll
///
/// Enroll a student (looked up by email) into the caller's course.
async fn handle_enroll(
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

    let body: EnrollRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let mongo = match require_mongo(&state) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let course = match require_owned_course(mongo, course_id, &claims).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    // Resolve the student by email
    let users = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let student = match users.find_one(doc! { "email": &body.email }).await {
        Ok(Some(u)) => u,
        Ok(None) => return error_response(&LecternError::NotFound("User")),
        Err(e) => return error_response(&e),
    };

    if student.role != Role::Student {
        return error_response(&LecternError::Validation(
            "Only students can be enrolled".into(),
        ));
    }

    let enrollments = match mongo
        .collection::<EnrollmentDoc>(ENROLLMENT_COLLECTION)
        .await
    {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let student_id = student.id_hex();
    match enrollments
        .find_one(doc! { "student_id": &student_id, "course_id": course_id })
        .await
    {
        Ok(Some(_)) => {
            return error_response(&LecternError::Conflict("Already enrolled".into()));
        }
        Ok(None) => {}
        Err(e) => return error_response(&e),
    }

    match enrollments
        .insert_one(EnrollmentDoc::new(student_id, course_id.to_string()))
        .await
    {
        Ok(_) => {
            info!("Enrolled {} into {}", body.email, course.title);
            json_response(
                StatusCode::CREATED,
                &SuccessResponse {
                    success: true,
                    message: "Enrollment successful".into(),
                },
            )
        }
        Err(e) => {
            // Unique index may reject a concurrent duplicate enrollment
            let error_str = e.to_string();
            if error_str.contains("duplicate key") || error_str.contains("E11000") {
                return error_response(&LecternError::Conflict("Already enrolled".into()));
            }
            error_response(&e)
        }
    }
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle course-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None if not a course route.
pub async fn handle_course_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if !path.starts_with("/api/courses") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(&path);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    // segments = ["api", "courses", ...]
    let response = match (&method, &segments[2..]) {
        (&Method::POST, []) => handle_create_course(req, state).await,
        (&Method::GET, []) => handle_list_courses(req, state).await,
        (&Method::GET, ["assigned"]) => handle_assigned_courses(req, state).await,
        (&Method::GET, [id]) => handle_get_course(req, state, id).await,
        (&Method::DELETE, [id]) => handle_delete_course(req, state, id).await,
        (&Method::POST, [id, "enroll"]) => handle_enroll(req, state, id).await,
        (&Method::POST, [id, "chapters"]) => {
            chapters::handle_create_chapter(req, state, id).await
        }
        (&Method::GET, [id, "chapters"]) => chapters::handle_list_chapters(req, state, id).await,

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Course endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
