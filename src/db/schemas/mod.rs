//! Database schemas for Lectern
//!
//! Defines MongoDB document structures for users, courses, chapters,
//! enrollments, and progress records.

mod chapter;
mod course;
mod enrollment;
mod metadata;
mod progress;
mod user;

pub use chapter::{ChapterDoc, CHAPTER_COLLECTION};
pub use course::{CourseDoc, COURSE_COLLECTION};
pub use enrollment::{EnrollmentDoc, ENROLLMENT_COLLECTION};
pub use metadata::Metadata;
pub use progress::{ProgressDoc, PROGRESS_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
