//! Outcome kernel, cancellation protocol, error taxonomy, configuration,
//! and the shared domain model that every stage crate builds on.

pub mod calendar;
pub mod cancel;
pub mod config;
pub mod error;
pub mod model;
pub mod outcome;

pub use cancel::{CancellationToken, StageContext};
pub use error::ErrorKind;
pub use outcome::{partial_cancelled, Outcome, OutcomeError, Warned};
