//! Repository abstractions and reference storage adapters (§6 persisted
//! state layout). Concrete production persistence is out of scope (§1);
//! the adapters here exist so the rest of the workspace has something
//! real to run its tests against.

pub mod error;
pub mod memory;
pub mod repository;
pub mod sqlite;

pub use error::{DbError, Result};
pub use memory::{InMemoryAuditRepository, InMemoryFileMetadataRepository, InMemoryReviewCaseRepository};
pub use repository::{AuditRepository, FileMetadataRepository, Repository, ReviewCaseRepository};
pub use sqlite::SqliteAuditRepository;
