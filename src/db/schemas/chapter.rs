//! Chapter schema
//!
//! Chapters are ordered within a course by `sequence_order`. The order
//! values need not be contiguous; "previous chapter" always means the
//! chapter with the next-lowest order in the same course.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for chapters
pub const CHAPTER_COLLECTION: &str = "chapters";

/// Chapter belonging to exactly one course
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ChapterDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Hex id of the owning course
    pub course_id: String,

    /// Chapter title
    pub title: String,

    /// Video content URL
    pub video_url: String,

    /// Position within the course, unique per course
    pub sequence_order: i32,
}

impl ChapterDoc {
    /// Create a new chapter document
    pub fn new(course_id: String, title: String, video_url: String, sequence_order: i32) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            course_id,
            title,
            video_url,
            sequence_order,
        }
    }

    /// Hex string form of the document id
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for ChapterDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One chapter per sequence slot within a course
            (
                doc! { "course_id": 1, "sequence_order": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("course_sequence_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ChapterDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
