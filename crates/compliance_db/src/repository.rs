//! The `Repository<T,Id>` collaborator contract (§6) plus the
//! pipeline-specific repositories that sit on top of it. Concrete
//! persistence engines are out of scope (§1 Non-goals); this crate ships
//! one reference adapter per repository so the rest of the workspace and
//! its tests have something to run against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use compliance_core::model::{AuditActionType, AuditRecord, FileMetadata, ReviewCase};
use compliance_ids::{CaseId, FileId};

use crate::error::Result;

/// Generic lookup-by-id plus list-by-specification contract.
#[async_trait]
pub trait Repository<T, Id>: Send + Sync {
    async fn get_by_id(&self, id: &Id) -> Result<Option<T>>;
    async fn list(&self, spec: &dyn Fn(&T) -> bool) -> Result<Vec<T>>;
}

/// File metadata storage with the checksum-uniqueness contract (invariant
/// I1: no two records may share a checksum).
#[async_trait]
pub trait FileMetadataRepository: Repository<FileMetadata, FileId> {
    /// Insert a new record. Returns `DbError::Constraint` if the checksum
    /// is already present.
    async fn insert(&self, metadata: FileMetadata) -> Result<()>;

    async fn checksum_exists(&self, checksum: &str) -> Result<bool>;
}

/// Append-only audit storage (§4.2), queryable by time range and optional
/// filters, always returned Timestamp-ascending (ties by AuditId).
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<()>;

    async fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        action_type: Option<AuditActionType>,
        user_id: Option<&str>,
    ) -> Result<Vec<AuditRecord>>;
}

/// Review case storage (§4.7 sub-flow C).
#[async_trait]
pub trait ReviewCaseRepository: Repository<ReviewCase, CaseId> {
    async fn insert(&self, case: ReviewCase) -> Result<()>;
    async fn update_status(&self, case_id: &CaseId, status: compliance_core::model::ReviewStatus) -> Result<()>;
}
