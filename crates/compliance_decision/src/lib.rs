//! Decision Logic stage (C7, §4.7): resolve person identities, classify
//! legal directives into compliance actions, and manage the
//! human-in-the-loop review queue.

pub mod combined;
pub mod directive;
pub mod identity;
pub mod review;

pub use combined::{process_decision_logic, DecisionLogicResult};
pub use directive::{classify_legal_directives, DirectiveError, LegalDirectiveClassifier};
pub use identity::{deduplicate, resolve_personas, IdentityError, PersonIdentityResolver};
pub use review::{identify_review_cases, process_review_decision, queue_review_cases};
