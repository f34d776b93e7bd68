//! Sequential progress and certificate eligibility
//!
//! The sequence gate authorizes and records chapter completions in order;
//! the certificate gate decides whether a student has completed every
//! chapter of a course. Both read the catalog and ledger through store
//! traits with MongoDB implementations.

pub mod certificate;
pub mod gate;
pub mod store;

pub use certificate::{CertificateGate, Eligibility};
pub use gate::{Admission, ChapterStatus, SequenceGate};
pub use store::{
    Chapter, ChapterCatalog, MongoCatalog, MongoLedger, ProgressLedger, ProgressRecord,
};
