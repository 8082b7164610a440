//! Error *kinds* (§7), not a type hierarchy — each is attached to an
//! [`crate::outcome::OutcomeError`] message rather than replacing it, so the
//! kind can travel in audit `ActionDetails` while the human-readable message
//! stays free-form.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Cancelled,
    Timeout,
    /// A collaborator (external interface, §6) failed.
    Dependency,
    /// A record failed export-readiness validation.
    Validation,
    /// Ingestion skipped a file because its checksum was already seen.
    Duplicate,
    /// An enumerative operation returned a partial (`Warned`) result.
    Partial,
}

impl ErrorKind {
    /// Whether this kind should ever reach a client as a Failure outcome.
    /// `Duplicate` and `Partial` are not failures per §7's propagation
    /// policy — they are reported as Success/Warned respectively.
    pub fn is_failure_kind(self) -> bool {
        !matches!(self, ErrorKind::Duplicate | ErrorKind::Partial)
    }
}
