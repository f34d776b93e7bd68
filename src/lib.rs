//! Lectern - course delivery backend
//!
//! Lectern serves courses made of ordered chapters. Students progress
//! through chapters strictly in sequence, and a certificate decision is
//! issued once every chapter of a course is completed.
//!
//! ## Services
//!
//! - **Accounts**: registration and login for students, mentors, and admins
//! - **Catalog**: course and chapter CRUD with mentor ownership
//! - **Sequence gate**: in-order chapter completion with a lock cascade
//! - **Certificate gate**: all-or-nothing course-completion eligibility

pub mod auth;
pub mod config;
pub mod db;
pub mod progress;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{LecternError, Result};
