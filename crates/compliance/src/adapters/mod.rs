//! Local-filesystem/rule-based reference implementations of every
//! collaborator trait the stage crates define but leave unimplemented
//! (§6). None of these are production-grade — the production browser
//! driver, OCR engine, identity registry, directive model, and
//! summarization model are all explicit Non-goals (§1) — but an
//! orchestrator binary needs *something* to run against, the same way
//! `compliance_db`/`compliance_sla` ship in-memory reference adapters for
//! their own out-of-scope persistence layer.

pub mod decision;
pub mod export;
pub mod extraction;
pub mod ingestion;
