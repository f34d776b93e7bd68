//! Certificate eligibility gate
//!
//! A course is certificate-eligible for a student only when every chapter id
//! of the course has a completed progress record for that student. The check
//! compares id sets rather than counts so duplicate or stale rows can never
//! inflate the completed tally. The decision is consumed by an external
//! document renderer; no artifact is produced here.

use serde::Serialize;
use std::sync::Arc;

use crate::progress::store::{ChapterCatalog, ProgressLedger};
use crate::types::{LecternError, Result};

/// Eligibility decision with supporting counts for the renderer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub eligible: bool,
    pub total_chapters: usize,
    pub completed_chapters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Decides course-completion eligibility
pub struct CertificateGate {
    catalog: Arc<dyn ChapterCatalog>,
    ledger: Arc<dyn ProgressLedger>,
}

impl CertificateGate {
    pub fn new(catalog: Arc<dyn ChapterCatalog>, ledger: Arc<dyn ProgressLedger>) -> Self {
        Self { catalog, ledger }
    }

    /// Whether the student has completed every chapter of the course
    pub async fn is_eligible(&self, student_id: &str, course_id: &str) -> Result<bool> {
        Ok(self.report(student_id, course_id).await?.eligible)
    }

    /// Full eligibility decision. Pure read.
    pub async fn report(&self, student_id: &str, course_id: &str) -> Result<Eligibility> {
        if !self.catalog.course_exists(course_id).await? {
            return Err(LecternError::NotFound("Course"));
        }

        let chapters = self.catalog.chapters_in_course(course_id).await?;
        if chapters.is_empty() {
            return Ok(Eligibility {
                eligible: false,
                total_chapters: 0,
                completed_chapters: 0,
                reason: Some("Course has no chapters"),
            });
        }

        let chapter_ids: Vec<String> = chapters.iter().map(|c| c.id.clone()).collect();
        let completed = self
            .ledger
            .completed_chapters(student_id, &chapter_ids)
            .await?;

        // Every chapter id must appear in the completed set, not merely
        // matching counts
        let eligible = chapter_ids.iter().all(|id| completed.contains(id));

        Ok(Eligibility {
            eligible,
            total_chapters: chapter_ids.len(),
            completed_chapters: chapter_ids.iter().filter(|id| completed.contains(*id)).count(),
            reason: if eligible {
                None
            } else {
                Some("Course not completed yet")
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::gate::SequenceGate;
    use crate::progress::store::memory::{MemoryCatalog, MemoryLedger};

    const STUDENT: &str = "student-1";
    const COURSE: &str = "course-1";

    fn setup(orders: &[i32]) -> (CertificateGate, SequenceGate, Arc<MemoryLedger>, Vec<String>) {
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

        let certificate = CertificateGate::new(
            Arc::clone(&catalog) as Arc<dyn ChapterCatalog>,
            Arc::clone(&ledger) as Arc<dyn ProgressLedger>,
        );
        let sequence = SequenceGate::new(
            Arc::clone(&catalog) as Arc<dyn ChapterCatalog>,
            Arc::clone(&ledger) as Arc<dyn ProgressLedger>,
        );
        (certificate, sequence, ledger, ids)
    }

    #[tokio::test]
    async fn eligibility_is_all_or_nothing() {
        let (certificate, _, ledger, ids) = setup(&[1, 2, 3]);

        ledger.mark_completed(STUDENT, &ids[0]);
        ledger.mark_completed(STUDENT, &ids[1]);

        let report = certificate.report(STUDENT, COURSE).await.unwrap();
        assert!(!report.eligible);
        assert_eq!(report.total_chapters, 3);
        assert_eq!(report.completed_chapters, 2);

        ledger.mark_completed(STUDENT, &ids[2]);
        assert!(certificate.is_eligible(STUDENT, COURSE).await.unwrap());
    }

    #[tokio::test]
    async fn empty_course_is_never_eligible() {
        let (certificate, _, _, _) = setup(&[]);

        let report = certificate.report(STUDENT, COURSE).await.unwrap();
        assert!(!report.eligible);
        assert_eq!(report.total_chapters, 0);
        assert_eq!(report.reason, Some("Course has no chapters"));
    }

    #[tokio::test]
    async fn foreign_completions_do_not_count() {
        let (certificate, _, ledger, ids) = setup(&[1]);

        // A completion from a different chapter must not satisfy the course
        ledger.mark_completed(STUDENT, "chapter-from-another-course");
        assert!(!certificate.is_eligible(STUDENT, COURSE).await.unwrap());

        ledger.mark_completed(STUDENT, &ids[0]);
        assert!(certificate.is_eligible(STUDENT, COURSE).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let (certificate, _, _, _) = setup(&[1]);

        let err = certificate.report(STUDENT, "missing").await.unwrap_err();
        assert!(matches!(err, LecternError::NotFound("Course")));
    }

    #[tokio::test]
    async fn full_course_run_ends_eligible() {
        // Math 101: Algebra (order 1), Calculus (order 2)
        let catalog = Arc::new(MemoryCatalog::default());
        let ledger = Arc::new(MemoryLedger::default());
        catalog.add_course("math-101");
        catalog.add_chapter("algebra", "math-101", "Algebra", 1);
        catalog.add_chapter("calculus", "math-101", "Calculus", 2);

        let sequence = SequenceGate::new(
            Arc::clone(&catalog) as Arc<dyn ChapterCatalog>,
            Arc::clone(&ledger) as Arc<dyn ProgressLedger>,
        );
        let certificate = CertificateGate::new(
            Arc::clone(&catalog) as Arc<dyn ChapterCatalog>,
            Arc::clone(&ledger) as Arc<dyn ProgressLedger>,
        );

        // Calculus first is blocked
        let err = sequence.complete(STUDENT, "calculus").await.unwrap_err();
        assert!(matches!(err, LecternError::SequenceViolation));
        assert!(!certificate.is_eligible(STUDENT, "math-101").await.unwrap());

        // Algebra, then Calculus
        sequence.complete(STUDENT, "algebra").await.unwrap();
        sequence.complete(STUDENT, "calculus").await.unwrap();

        assert!(certificate.is_eligible(STUDENT, "math-101").await.unwrap());
    }
}
