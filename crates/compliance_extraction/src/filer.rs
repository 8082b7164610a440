//! Move step (§4.5): relocate a file under an organized location keyed by
//! its classification. The concrete filesystem/object store is out of
//! scope; this crate defines the collaborator seam.

use async_trait::async_trait;
use compliance_core::model::ClassificationLabel;

#[async_trait]
pub trait FileMover: Send + Sync {
    /// Relocate the file currently at `current_path` under a
    /// classification-keyed location, returning the new path.
    async fn move_file(&self, current_path: &str, label: ClassificationLabel, safe_name: &str) -> Result<String, std::io::Error>;
}
