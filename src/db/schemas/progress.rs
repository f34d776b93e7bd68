//! Progress record schema
//!
//! One record per (student, chapter) pair. Records are written only by the
//! sequence gate; re-completion refreshes the timestamp on the same record.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for progress records
pub const PROGRESS_COLLECTION: &str = "progress";

/// Per-student, per-chapter completion fact
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProgressDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Hex id of the student
    pub student_id: String,

    /// Hex id of the completed chapter
    pub chapter_id: String,

    /// Completion flag
    #[serde(default)]
    pub is_completed: bool,

    /// When the chapter was (last) completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
}

impl IntoIndexes for ProgressDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one record per (student, chapter); the completion
            // upsert relies on this key
            (
                doc! { "student_id": 1, "chapter_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("student_chapter_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ProgressDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
