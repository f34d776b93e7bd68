//! Store seams for the progress gates
//!
//! The gates read the chapter catalog and the progress ledger through these
//! traits so the decision logic can be exercised without a database. The
//! MongoDB implementations are the production path.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::{ReadConcern, ReturnDocument, WriteConcern};
use serde::Serialize;
use std::collections::HashSet;

use crate::db::schemas::{
    ChapterDoc, CourseDoc, ProgressDoc, CHAPTER_COLLECTION, COURSE_COLLECTION, PROGRESS_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::{LecternError, Result};

/// Chapter as the gates see it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub video_url: String,
    pub sequence_order: i32,
}

impl From<ChapterDoc> for Chapter {
    fn from(doc: ChapterDoc) -> Self {
        Self {
            id: doc.id_hex(),
            course_id: doc.course_id,
            title: doc.title,
            video_url: doc.video_url,
            sequence_order: doc.sequence_order,
        }
    }
}

/// Completion fact returned by the ledger
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub student_id: String,
    pub chapter_id: String,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<ProgressDoc> for ProgressRecord {
    fn from(doc: ProgressDoc) -> Self {
        Self {
            student_id: doc.student_id,
            chapter_id: doc.chapter_id,
            is_completed: doc.is_completed,
            completed_at: doc
                .completed_at
                .and_then(|dt| dt.try_to_rfc3339_string().ok()),
        }
    }
}

/// Read access to the ordered chapter catalog
#[async_trait]
pub trait ChapterCatalog: Send + Sync {
    /// Look up a chapter by id; None if the id does not resolve
    async fn chapter(&self, chapter_id: &str) -> Result<Option<Chapter>>;

    /// Whether a course id resolves
    async fn course_exists(&self, course_id: &str) -> Result<bool>;

    /// All chapters of a course, ascending by sequence_order
    async fn chapters_in_course(&self, course_id: &str) -> Result<Vec<Chapter>>;
}

/// Read/write access to per-student completion records
#[async_trait]
pub trait ProgressLedger: Send + Sync {
    /// Whether the student has a completed record for the chapter
    async fn is_completed(&self, student_id: &str, chapter_id: &str) -> Result<bool>;

    /// Subset of the given chapter ids the student has completed
    async fn completed_chapters(
        &self,
        student_id: &str,
        chapter_ids: &[String],
    ) -> Result<HashSet<String>>;

    /// Record a completion for (student, chapter), keyed uniquely on the pair.
    ///
    /// The predecessor's completion is re-validated inside the same atomic
    /// operation as the upsert; two racing requests cannot both land an
    /// out-of-order write. Re-completion refreshes the existing record.
    async fn record_completion(
        &self,
        student_id: &str,
        chapter: &Chapter,
        predecessor: Option<&Chapter>,
    ) -> Result<ProgressRecord>;
}

// =============================================================================
// MongoDB implementations
// =============================================================================

/// MongoDB-backed chapter catalog
pub struct MongoCatalog {
    mongo: MongoClient,
}

impl MongoCatalog {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }
}

#[async_trait]
impl ChapterCatalog for MongoCatalog {
    async fn chapter(&self, chapter_id: &str) -> Result<Option<Chapter>> {
        // A malformed id can never resolve; treat it like a miss
        let Ok(oid) = ObjectId::parse_str(chapter_id) else {
            return Ok(None);
        };

        let collection = self.mongo.collection::<ChapterDoc>(CHAPTER_COLLECTION).await?;
        let doc = collection.find_one(doc! { "_id": oid }).await?;
        Ok(doc.map(Chapter::from))
    }

    async fn course_exists(&self, course_id: &str) -> Result<bool> {
        let Ok(oid) = ObjectId::parse_str(course_id) else {
            return Ok(false);
        };

        let collection = self.mongo.collection::<CourseDoc>(COURSE_COLLECTION).await?;
        Ok(collection.find_one(doc! { "_id": oid }).await?.is_some())
    }

    async fn chapters_in_course(&self, course_id: &str) -> Result<Vec<Chapter>> {
        let collection = self.mongo.collection::<ChapterDoc>(CHAPTER_COLLECTION).await?;
        let docs = collection
            .find_many_sorted(
                doc! { "course_id": course_id },
                doc! { "sequence_order": 1 },
            )
            .await?;
        Ok(docs.into_iter().map(Chapter::from).collect())
    }
}

/// MongoDB-backed progress ledger
pub struct MongoLedger {
    mongo: MongoClient,
}

impl MongoLedger {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }
}

#[async_trait]
impl ProgressLedger for MongoLedger {
    async fn is_completed(&self, student_id: &str, chapter_id: &str) -> Result<bool> {
        let collection = self.mongo.collection::<ProgressDoc>(PROGRESS_COLLECTION).await?;
        let record = collection
            .find_one(doc! {
                "student_id": student_id,
                "chapter_id": chapter_id,
                "is_completed": true,
            })
            .await?;
        Ok(record.is_some())
    }

    async fn completed_chapters(
        &self,
        student_id: &str,
        chapter_ids: &[String],
    ) -> Result<HashSet<String>> {
        if chapter_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let collection = self.mongo.collection::<ProgressDoc>(PROGRESS_COLLECTION).await?;
        let records = collection
            .find_many(doc! {
                "student_id": student_id,
                "is_completed": true,
                "chapter_id": { "$in": chapter_ids.to_vec() },
            })
            .await?;

        Ok(records.into_iter().map(|r| r.chapter_id).collect())
    }

    async fn record_completion(
        &self,
        student_id: &str,
        chapter: &Chapter,
        predecessor: Option<&Chapter>,
    ) -> Result<ProgressRecord> {
        // The wrapper ensures the unique (student_id, chapter_id) index exists
        let collection = self.mongo.collection::<ProgressDoc>(PROGRESS_COLLECTION).await?;
        let progress = collection.inner().clone();

        let mut session = self
            .mongo
            .inner()
            .start_session()
            .await
            .map_err(|e| LecternError::Database(format!("Failed to start session: {}", e)))?;

        session
            .start_transaction()
            .read_concern(ReadConcern::majority())
            .write_concern(WriteConcern::majority())
            .await
            .map_err(|e| LecternError::Database(format!("Failed to start transaction: {}", e)))?;

        // Re-validate the predecessor inside the transaction so a racing
        // out-of-order request cannot slip past the earlier check
        if let Some(prev) = predecessor {
            let done = progress
                .find_one(doc! {
                    "student_id": student_id,
                    "chapter_id": &prev.id,
                    "is_completed": true,
                    "metadata.is_deleted": { "$ne": true },
                })
                .session(&mut session)
                .await
                .map_err(|e| LecternError::Database(format!("Find failed: {}", e)))?;

            if done.is_none() {
                let _ = session.abort_transaction().await;
                return Err(LecternError::SequenceViolation);
            }
        }

        let now = DateTime::now();
        let updated = progress
            .find_one_and_update(
                doc! { "student_id": student_id, "chapter_id": &chapter.id },
                doc! {
                    "$set": {
                        "is_completed": true,
                        "completed_at": now,
                        "metadata.is_deleted": false,
                        "metadata.updated_at": now,
                    },
                    "$setOnInsert": { "metadata.created_at": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .session(&mut session)
            .await
            .map_err(|e| LecternError::Database(format!("Completion upsert failed: {}", e)))?;

        session
            .commit_transaction()
            .await
            .map_err(|e| LecternError::Database(format!("Commit failed: {}", e)))?;

        let doc = updated
            .ok_or_else(|| LecternError::Database("Completion upsert returned no document".into()))?;
        Ok(ProgressRecord::from(doc))
    }
}

// =============================================================================
// In-memory implementations for gate tests
// =============================================================================

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Catalog backed by plain vectors
    #[derive(Default)]
    pub struct MemoryCatalog {
        courses: Mutex<Vec<String>>,
        chapters: Mutex<Vec<Chapter>>,
    }

    impl MemoryCatalog {
        pub fn add_course(&self, course_id: &str) {
            self.courses.lock().unwrap().push(course_id.to_string());
        }

        pub fn add_chapter(&self, id: &str, course_id: &str, title: &str, order: i32) -> Chapter {
            let chapter = Chapter {
                id: id.to_string(),
                course_id: course_id.to_string(),
                title: title.to_string(),
                video_url: format!("http://videos.test/{}", id),
                sequence_order: order,
            };
            self.chapters.lock().unwrap().push(chapter.clone());
            chapter
        }
    }

    #[async_trait]
    impl ChapterCatalog for MemoryCatalog {
        async fn chapter(&self, chapter_id: &str) -> Result<Option<Chapter>> {
            Ok(self
                .chapters
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == chapter_id)
                .cloned())
        }

        async fn course_exists(&self, course_id: &str) -> Result<bool> {
            Ok(self.courses.lock().unwrap().iter().any(|c| c == course_id))
        }

        async fn chapters_in_course(&self, course_id: &str) -> Result<Vec<Chapter>> {
            let mut chapters: Vec<Chapter> = self
                .chapters
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.course_id == course_id)
                .cloned()
                .collect();
            chapters.sort_by_key(|c| c.sequence_order);
            Ok(chapters)
        }
    }

    /// Ledger backed by a map keyed on (student, chapter).
    /// A single lock spans the predecessor check and the upsert, mirroring
    /// the transactional write of the MongoDB ledger.
    #[derive(Default)]
    pub struct MemoryLedger {
        records: Mutex<HashMap<(String, String), ProgressRecord>>,
    }

    impl MemoryLedger {
        pub fn record_count(&self) -> usize {
            self.records.lock().unwrap().len()
        }

        pub fn mark_completed(&self, student_id: &str, chapter_id: &str) {
            self.records.lock().unwrap().insert(
                (student_id.to_string(), chapter_id.to_string()),
                ProgressRecord {
                    student_id: student_id.to_string(),
                    chapter_id: chapter_id.to_string(),
                    is_completed: true,
                    completed_at: Some(chrono::Utc::now().to_rfc3339()),
                },
            );
        }
    }

    #[async_trait]
    impl ProgressLedger for MemoryLedger {
        async fn is_completed(&self, student_id: &str, chapter_id: &str) -> Result<bool> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&(student_id.to_string(), chapter_id.to_string()))
                .map(|r| r.is_completed)
                .unwrap_or(false))
        }

        async fn completed_chapters(
            &self,
            student_id: &str,
            chapter_ids: &[String],
        ) -> Result<HashSet<String>> {
            let records = self.records.lock().unwrap();
            Ok(chapter_ids
                .iter()
                .filter(|id| {
                    records
                        .get(&(student_id.to_string(), (*id).clone()))
                        .map(|r| r.is_completed)
                        .unwrap_or(false)
                })
                .cloned()
                .collect())
        }

        async fn record_completion(
            &self,
            student_id: &str,
            chapter: &Chapter,
            predecessor: Option<&Chapter>,
        ) -> Result<ProgressRecord> {
            let mut records = self.records.lock().unwrap();

            if let Some(prev) = predecessor {
                let done = records
                    .get(&(student_id.to_string(), prev.id.clone()))
                    .map(|r| r.is_completed)
                    .unwrap_or(false);
                if !done {
                    return Err(LecternError::SequenceViolation);
                }
            }

            let record = ProgressRecord {
                student_id: student_id.to_string(),
                chapter_id: chapter.id.clone(),
                is_completed: true,
                completed_at: Some(chrono::Utc::now().to_rfc3339()),
            };
            records.insert(
                (student_id.to_string(), chapter.id.clone()),
                record.clone(),
            );
            Ok(record)
        }
    }
}
