//! In-memory reference adapters. Useful for tests and for a CLI run with
//! no external database configured; not a production persistence layer.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use compliance_core::model::{
    AuditActionType, AuditRecord, FileMetadata, ReviewCase, ReviewStatus,
};
use compliance_ids::{CaseId, FileId};

use crate::error::{DbError, Result};
use crate::repository::{AuditRepository, FileMetadataRepository, Repository, ReviewCaseRepository};

#[derive(Default)]
pub struct InMemoryFileMetadataRepository {
    rows: Mutex<Vec<FileMetadata>>,
}

#[async_trait]
impl Repository<FileMetadata, FileId> for InMemoryFileMetadataRepository {
    async fn get_by_id(&self, id: &FileId) -> Result<Option<FileMetadata>> {
        Ok(self.rows.lock().unwrap().iter().find(|r| &r.file_id == id).cloned())
    }

    async fn list(&self, spec: &dyn Fn(&FileMetadata) -> bool) -> Result<Vec<FileMetadata>> {
        Ok(self.rows.lock().unwrap().iter().filter(|r| spec(r)).cloned().collect())
    }
}

#[async_trait]
impl FileMetadataRepository for InMemoryFileMetadataRepository {
    async fn insert(&self, metadata: FileMetadata) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.checksum == metadata.checksum) {
            return Err(DbError::constraint(format!(
                "checksum {} already present",
                metadata.checksum
            )));
        }
        rows.push(metadata);
        Ok(())
    }

    async fn checksum_exists(&self, checksum: &str) -> Result<bool> {
        Ok(self.rows.lock().unwrap().iter().any(|r| r.checksum == checksum))
    }
}

/// In-memory audit store, ordered Timestamp-ascending with AuditId as the
/// tiebreaker, matching §4.2's ordering contract.
#[derive(Default)]
pub struct InMemoryAuditRepository {
    rows: Mutex<Vec<AuditRecord>>,
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let insert_at = rows
            .partition_point(|r| (r.timestamp, r.audit_id.as_str()) <= (record.timestamp, record.audit_id.as_str()));
        rows.insert(insert_at, record);
        Ok(())
    }

    async fn query(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        action_type: Option<AuditActionType>,
        user_id: Option<&str>,
    ) -> Result<Vec<AuditRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .filter(|r| action_type.map(|a| r.action_type == a).unwrap_or(true))
            .filter(|r| user_id.map(|u| r.user_id.as_deref() == Some(u)).unwrap_or(true))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryReviewCaseRepository {
    rows: Mutex<Vec<ReviewCase>>,
}

#[async_trait]
impl Repository<ReviewCase, CaseId> for InMemoryReviewCaseRepository {
    async fn get_by_id(&self, id: &CaseId) -> Result<Option<ReviewCase>> {
        Ok(self.rows.lock().unwrap().iter().find(|c| &c.case_id == id).cloned())
    }

    async fn list(&self, spec: &dyn Fn(&ReviewCase) -> bool) -> Result<Vec<ReviewCase>> {
        Ok(self.rows.lock().unwrap().iter().filter(|c| spec(c)).cloned().collect())
    }
}

#[async_trait]
impl ReviewCaseRepository for InMemoryReviewCaseRepository {
    async fn insert(&self, case: ReviewCase) -> Result<()> {
        self.rows.lock().unwrap().push(case);
        Ok(())
    }

    async fn update_status(&self, case_id: &CaseId, status: ReviewStatus) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let case = rows
            .iter_mut()
            .find(|c| &c.case_id == case_id)
            .ok_or_else(|| DbError::not_found(format!("review case {case_id}")))?;
        case.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_core::model::{AuditActionType, Format, Stage};
    use compliance_ids::CorrelationId;

    fn sample_file(checksum: &str) -> FileMetadata {
        FileMetadata {
            file_id: FileId::new(),
            file_name: "oficio.pdf".to_string(),
            file_path: "opaque://1".to_string(),
            source_url: "https://example.gov/oficio.pdf".to_string(),
            download_timestamp: Utc::now(),
            checksum: checksum.to_string(),
            file_size_bytes: 1024,
            format: Format::Pdf,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_checksum() {
        let repo = InMemoryFileMetadataRepository::default();
        repo.insert(sample_file("abc")).await.unwrap();
        let err = repo.insert(sample_file("abc")).await.unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[tokio::test]
    async fn audit_query_orders_by_timestamp_ascending() {
        let repo = InMemoryAuditRepository::default();
        let base = Utc::now();
        let later = AuditRecord {
            timestamp: base + chrono::Duration::seconds(5),
            ..AuditRecord::with_details(
                CorrelationId::new(),
                AuditActionType::Download,
                Stage::Ingestion,
                true,
                &serde_json::json!({}),
            )
        };
        let earlier = AuditRecord {
            timestamp: base,
            ..AuditRecord::with_details(
                CorrelationId::new(),
                AuditActionType::Download,
                Stage::Ingestion,
                true,
                &serde_json::json!({}),
            )
        };
        repo.append(later.clone()).await.unwrap();
        repo.append(earlier.clone()).await.unwrap();

        let results = repo
            .query(base - chrono::Duration::seconds(1), base + chrono::Duration::seconds(10), None, None)
            .await
            .unwrap();
        assert_eq!(results, vec![earlier, later]);
    }
}
