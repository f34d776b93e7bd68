//! Sequential progress gate
//!
//! Chapters unlock strictly in `sequence_order`: a chapter may be completed
//! only once the chapter with the next-lowest order in its course is
//! completed. One incomplete chapter locks everything after it, even if a
//! later chapter somehow carries a completion record.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::progress::store::{Chapter, ChapterCatalog, ProgressLedger, ProgressRecord};
use crate::types::{LecternError, Result};

/// Outcome of an admissibility check
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl Admission {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn denied(reason: &'static str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Chapter annotated with the student's completion and lock state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterStatus {
    #[serde(flatten)]
    pub chapter: Chapter,
    pub is_completed: bool,
    pub is_locked: bool,
}

/// Enforces in-order chapter completion
pub struct SequenceGate {
    catalog: Arc<dyn ChapterCatalog>,
    ledger: Arc<dyn ProgressLedger>,
}

impl SequenceGate {
    pub fn new(catalog: Arc<dyn ChapterCatalog>, ledger: Arc<dyn ProgressLedger>) -> Self {
        Self { catalog, ledger }
    }

    /// Whether the student may complete the chapter right now. Pure read.
    pub async fn can_complete(&self, student_id: &str, chapter_id: &str) -> Result<Admission> {
        let chapter = self
            .catalog
            .chapter(chapter_id)
            .await?
            .ok_or(LecternError::NotFound("Chapter"))?;

        match self.predecessor(&chapter).await? {
            None => Ok(Admission::allowed()),
            Some(prev) => {
                if self.ledger.is_completed(student_id, &prev.id).await? {
                    Ok(Admission::allowed())
                } else {
                    Ok(Admission::denied("Previous chapter must be completed first"))
                }
            }
        }
    }

    /// Complete a chapter for a student.
    ///
    /// Admissibility is checked up front for a fast failure, then
    /// re-validated by the ledger inside the same atomic operation as the
    /// upsert. Completing an already-completed chapter succeeds and
    /// refreshes the record.
    pub async fn complete(&self, student_id: &str, chapter_id: &str) -> Result<ProgressRecord> {
        let chapter = self
            .catalog
            .chapter(chapter_id)
            .await?
            .ok_or(LecternError::NotFound("Chapter"))?;

        let predecessor = self.predecessor(&chapter).await?;

        if let Some(ref prev) = predecessor {
            if !self.ledger.is_completed(student_id, &prev.id).await? {
                return Err(LecternError::SequenceViolation);
            }
        }

        self.ledger
            .record_completion(student_id, &chapter, predecessor.as_ref())
            .await
    }

    /// All chapters of a course with the student's completion and lock state,
    /// ascending by sequence_order.
    pub async fn list_with_status(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Vec<ChapterStatus>> {
        if !self.catalog.course_exists(course_id).await? {
            return Err(LecternError::NotFound("Course"));
        }

        let chapters = self.catalog.chapters_in_course(course_id).await?;
        let chapter_ids: Vec<String> = chapters.iter().map(|c| c.id.clone()).collect();
        let completed = self
            .ledger
            .completed_chapters(student_id, &chapter_ids)
            .await?;

        Ok(annotate_lock_state(chapters, &completed))
    }

    /// The chapter with the greatest sequence_order strictly below the given
    /// one in the same course. Order values may have gaps; "previous" is by
    /// order, not order minus one.
    async fn predecessor(&self, chapter: &Chapter) -> Result<Option<Chapter>> {
        let chapters = self.catalog.chapters_in_course(&chapter.course_id).await?;
        Ok(chapters
            .into_iter()
            .filter(|c| c.sequence_order < chapter.sequence_order)
            .max_by_key(|c| c.sequence_order))
    }
}

/// Fold the ordered chapter list into its annotated form, carrying the
/// previous chapter's completion as the accumulator (seeded true so the
/// first chapter is always unlocked). A single incomplete chapter locks
/// every chapter after it regardless of their individual records.
fn annotate_lock_state(chapters: Vec<Chapter>, completed: &HashSet<String>) -> Vec<ChapterStatus> {
    chapters
        .into_iter()
        .scan(true, |previous_completed, chapter| {
            let is_completed = completed.contains(&chapter.id);
            let is_locked = !*previous_completed;
            *previous_completed = is_completed;
            Some(ChapterStatus {
                chapter,
                is_completed,
                is_locked,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::store::memory::{MemoryCatalog, MemoryLedger};

    const STUDENT: &str = "student-1";
    const COURSE: &str = "course-1";

    fn gate_with_orders(orders: &[i32]) -> (SequenceGate, Arc<MemoryLedger>, Vec<String>) {
        let catalog = Arc::new(MemoryCatalog::default());
        let ledger = Arc::new(MemoryLedger::default());

        catalog.add_course(COURSE);
        let ids: Vec<String> = orders
            .iter()
            .map(|order| {
                let id = format!("chapter-{}", order);
                catalog.add_chapter(&id, COURSE, &format!("Chapter {}", order), *order);
                id
            })
            .collect();

        let gate = SequenceGate::new(catalog, Arc::clone(&ledger) as Arc<dyn ProgressLedger>);
        (gate, ledger, ids)
    }

    #[tokio::test]
    async fn first_chapter_is_always_admissible() {
        let (gate, _, ids) = gate_with_orders(&[1, 2, 3]);

        let admission = gate.can_complete(STUDENT, &ids[0]).await.unwrap();
        assert!(admission.allowed);
        assert!(admission.reason.is_none());
    }

    #[tokio::test]
    async fn out_of_order_completion_is_rejected_then_allowed() {
        let (gate, _, ids) = gate_with_orders(&[1, 2, 3]);

        // Chapter 2 blocked while chapter 1 is incomplete
        let err = gate.complete(STUDENT, &ids[1]).await.unwrap_err();
        assert!(matches!(err, LecternError::SequenceViolation));

        // Chapter 1 goes through
        let record = gate.complete(STUDENT, &ids[0]).await.unwrap();
        assert!(record.is_completed);

        // Chapter 2 now unlocked
        assert!(gate.complete(STUDENT, &ids[1]).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_completion_writes_nothing() {
        let (gate, ledger, ids) = gate_with_orders(&[1, 2]);

        let _ = gate.complete(STUDENT, &ids[1]).await.unwrap_err();
        assert_eq!(ledger.record_count(), 0);
    }

    #[tokio::test]
    async fn recompletion_is_idempotent() {
        let (gate, ledger, ids) = gate_with_orders(&[1, 2]);

        gate.complete(STUDENT, &ids[0]).await.unwrap();
        gate.complete(STUDENT, &ids[0]).await.unwrap();

        // Exactly one record for the (student, chapter) pair
        assert_eq!(ledger.record_count(), 1);
    }

    #[tokio::test]
    async fn gaps_in_sequence_order_are_tolerated() {
        let (gate, _, ids) = gate_with_orders(&[1, 5, 10]);

        // Order 10 is blocked by order 5, not by a missing order 9
        let err = gate.complete(STUDENT, &ids[2]).await.unwrap_err();
        assert!(matches!(err, LecternError::SequenceViolation));

        gate.complete(STUDENT, &ids[0]).await.unwrap();
        assert!(gate.can_complete(STUDENT, &ids[1]).await.unwrap().allowed);
        gate.complete(STUDENT, &ids[1]).await.unwrap();
        gate.complete(STUDENT, &ids[2]).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_chapter_is_not_found() {
        let (gate, _, _) = gate_with_orders(&[1]);

        let err = gate.can_complete(STUDENT, "missing").await.unwrap_err();
        assert!(matches!(err, LecternError::NotFound("Chapter")));

        let err = gate.complete(STUDENT, "missing").await.unwrap_err();
        assert!(matches!(err, LecternError::NotFound("Chapter")));
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let (gate, _, _) = gate_with_orders(&[1]);

        let err = gate.list_with_status(STUDENT, "missing").await.unwrap_err();
        assert!(matches!(err, LecternError::NotFound("Course")));
    }

    #[tokio::test]
    async fn lock_cascade_hides_out_of_order_records() {
        let (gate, ledger, ids) = gate_with_orders(&[1, 2, 3, 4]);

        // Chapters 1 and 3 completed, 2 left open (as a race could leave it)
        ledger.mark_completed(STUDENT, &ids[0]);
        ledger.mark_completed(STUDENT, &ids[2]);

        let statuses = gate.list_with_status(STUDENT, COURSE).await.unwrap();

        // Chapter 1: completed, unlocked
        assert!(statuses[0].is_completed && !statuses[0].is_locked);
        // Chapter 2: open, unlocked (its predecessor is complete)
        assert!(!statuses[1].is_completed && !statuses[1].is_locked);
        // Chapter 3: completed but locked behind chapter 2
        assert!(statuses[2].is_completed && statuses[2].is_locked);
        // Chapter 4: locked
        assert!(statuses[3].is_locked);
    }

    #[tokio::test]
    async fn everything_after_first_gap_is_locked() {
        let (gate, ledger, ids) = gate_with_orders(&[1, 2, 3, 4, 5]);

        ledger.mark_completed(STUDENT, &ids[0]);
        ledger.mark_completed(STUDENT, &ids[1]);

        let statuses = gate.list_with_status(STUDENT, COURSE).await.unwrap();

        let first_gap = statuses.iter().position(|s| !s.is_completed).unwrap();
        for (i, status) in statuses.iter().enumerate() {
            if i <= first_gap {
                assert!(!status.is_locked, "chapter {} should be unlocked", i);
            } else {
                assert!(status.is_locked, "chapter {} should be locked", i);
            }
        }
    }

    #[tokio::test]
    async fn listing_is_ordered_by_sequence() {
        let (gate, _, _) = gate_with_orders(&[10, 1, 5]);

        let statuses = gate.list_with_status(STUDENT, COURSE).await.unwrap();
        let orders: Vec<i32> = statuses.iter().map(|s| s.chapter.sequence_order).collect();
        assert_eq!(orders, vec![1, 5, 10]);
    }
}
