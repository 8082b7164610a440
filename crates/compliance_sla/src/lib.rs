//! C9 SLA Tracker (§4.9): deadline computation, the escalation ladder, and
//! the `ActiveCases`/`AtRiskCases`/`BreachedCases` cohort queries that drive
//! workflow transitions elsewhere in the pipeline.

pub mod source;
pub mod tracker;

pub use source::{InMemorySlaCaseSource, SlaCaseInput, SlaCaseSource};
pub use tracker::SlaTracker;
