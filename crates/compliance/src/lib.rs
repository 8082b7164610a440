//! Orchestrator library backing the `compliance` binary. Every stage's
//! production collaborators (browser automation, OCR, a real regulator
//! database, …) are out of scope per spec §1/§6; the adapters in this
//! crate are the "wire a real-enough implementation in" layer the other
//! stage crates leave for an integration root.

pub mod adapters;
pub mod orchestrator;

pub use orchestrator::{PipelineRuntime, RunSummary};
