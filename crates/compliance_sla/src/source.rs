//! The data a tracked case needs beyond what [`compliance_core::model::SLAStatus`]
//! itself stores. Persistence is out of scope (§1 Non-goals); a case source
//! is the collaborator the tracker's cohort queries (§4.9 `ActiveCases`,
//! `AtRiskCases`, `BreachedCases`) read from, recomputing `SLAStatus` rather
//! than trusting a stored copy (§6: "recomputation is canonical").

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;

use compliance_ids::FileId;

/// One tracked file's deadline inputs: when it was taken in, and how many
/// business days it has to respond.
#[derive(Debug, Clone, PartialEq)]
pub struct SlaCaseInput {
    pub file_id: FileId,
    pub intake_date: NaiveDate,
    pub days_plazo: i64,
}

/// Source of the cases the tracker's cohort queries iterate over.
#[async_trait]
pub trait SlaCaseSource: Send + Sync {
    async fn tracked_cases(&self) -> Vec<SlaCaseInput>;
}

/// Reference in-memory case source, used by this crate's own tests and
/// available to callers with no persistence layer wired up yet.
#[derive(Default)]
pub struct InMemorySlaCaseSource {
    cases: Mutex<HashMap<FileId, SlaCaseInput>>,
}

impl InMemorySlaCaseSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, case: SlaCaseInput) {
        self.cases.lock().unwrap().insert(case.file_id.clone(), case);
    }

    pub fn untrack(&self, file_id: &FileId) {
        self.cases.lock().unwrap().remove(file_id);
    }
}

#[async_trait]
impl SlaCaseSource for InMemorySlaCaseSource {
    async fn tracked_cases(&self) -> Vec<SlaCaseInput> {
        self.cases.lock().unwrap().values().cloned().collect()
    }
}
