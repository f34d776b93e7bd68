//! Enrollment schema
//!
//! An enrollment grants a student visibility into a course's chapters.
//! The progress gates assume enrollment as a given fact and never create it.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for enrollments
pub const ENROLLMENT_COLLECTION: &str = "enrollments";

/// Student-to-course enrollment, unique per pair
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EnrollmentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Hex id of the enrolled student
    pub student_id: String,

    /// Hex id of the course
    pub course_id: String,
}

impl EnrollmentDoc {
    /// Create a new enrollment document
    pub fn new(student_id: String, course_id: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            student_id,
            course_id,
        }
    }
}

impl IntoIndexes for EnrollmentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "student_id": 1, "course_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("student_course_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for EnrollmentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
