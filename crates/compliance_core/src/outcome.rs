//! The four-state outcome every pipeline operation returns.
//!
//! No domain failure is ever signalled by panicking or by an uncaught
//! exception-equivalent; callers observe one of `Success`, `Failure`,
//! `Cancelled`, or `Warned` and the contract in §4.1 governs how each
//! collaborator's outcome propagates into its caller's.

use std::fmt;

/// Result of a fallible, cancellable, possibly-partial pipeline operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation completed and produced a value.
    Success(T),
    /// The operation could not complete; no value is available.
    Failure(OutcomeError),
    /// The caller's cancellation token was observed; no value is available.
    Cancelled,
    /// The operation completed partially: a degraded value is available
    /// alongside warnings, a confidence fraction, and the fraction of
    /// expected work that was *not* completed.
    Warned(Warned<T>),
}

/// Payload carried by [`Outcome::Warned`].
#[derive(Debug, Clone, PartialEq)]
pub struct Warned<T> {
    pub value: T,
    pub warnings: Vec<String>,
    /// Fraction of requested work completed, in `[0,1]`.
    pub confidence: f64,
    /// `1.0 - confidence`, kept explicit per invariant I6 rather than derived
    /// at every call site.
    pub missing_data_ratio: f64,
}

impl<T> Warned<T> {
    pub fn new(value: T, warnings: Vec<String>, confidence: f64) -> Self {
        Self {
            value,
            warnings,
            confidence,
            missing_data_ratio: 1.0 - confidence,
        }
    }
}

/// An unrecoverable-at-this-level error, with an optional upstream cause
/// chained the way a wrapped `anyhow`/`thiserror` error would be, but kept
/// string-based so `Outcome` stays serializable for audit `ActionDetails`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeError {
    pub message: String,
    pub cause: Option<Box<OutcomeError>>,
}

impl OutcomeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn wrap(context: impl Into<String>, cause: OutcomeError) -> Self {
        Self {
            message: context.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

impl fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for OutcomeError {}

impl<E: std::error::Error> From<E> for OutcomeError {
    fn from(err: E) -> Self {
        OutcomeError::new(err.to_string())
    }
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure(OutcomeError::new(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn is_warned(&self) -> bool {
        matches!(self, Outcome::Warned(_))
    }

    /// Map the success/warned value, leaving `Failure`/`Cancelled` untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(v) => Outcome::Success(f(v)),
            Outcome::Warned(w) => Outcome::Warned(Warned {
                value: f(w.value),
                warnings: w.warnings,
                confidence: w.confidence,
                missing_data_ratio: w.missing_data_ratio,
            }),
            Outcome::Failure(e) => Outcome::Failure(e),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }

    /// Chain a fallible continuation. `Cancelled` is checked before the
    /// continuation runs, per §4.1(a): cancellation always propagates
    /// before a failure would be evaluated.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Outcome::Cancelled => Outcome::Cancelled,
            Outcome::Failure(e) => Outcome::Failure(e),
            Outcome::Success(v) => f(v),
            Outcome::Warned(w) => match f(w.value) {
                Outcome::Success(v2) => Outcome::Warned(Warned {
                    value: v2,
                    warnings: w.warnings,
                    confidence: w.confidence,
                    missing_data_ratio: w.missing_data_ratio,
                }),
                Outcome::Warned(w2) => Outcome::Warned(Warned {
                    value: w2.value,
                    warnings: [w.warnings, w2.warnings].concat(),
                    confidence: w.confidence.min(w2.confidence),
                    missing_data_ratio: w.missing_data_ratio.max(w2.missing_data_ratio),
                }),
                other => other,
            },
        }
    }

    /// Propagate a sub-call's `Cancelled` outcome before evaluating anything
    /// else about it, per §4.1(b)/(c): contract (a)-(c) collapsed into one
    /// call for the common "map a collaborator outcome into my own" shape.
    pub fn propagate_cancelled<U>(sub: &Outcome<U>) -> Option<Outcome<T>> {
        if sub.is_cancelled() {
            Some(Outcome::Cancelled)
        } else {
            None
        }
    }

    /// Extract the value out of `Success`/`Warned`, or `None` otherwise.
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Success(v) => Some(v),
            Outcome::Warned(w) => Some(w.value),
            _ => None,
        }
    }
}

/// Build a `Warned` outcome for an enumerative operation cancelled partway
/// through, per §4.3 contract 3 and invariant I6.
pub fn partial_cancelled<T>(value: T, completed: usize, total: usize, note: &str) -> Outcome<T> {
    if completed == 0 {
        return Outcome::Cancelled;
    }
    let confidence = completed as f64 / total as f64;
    Outcome::Warned(Warned::new(
        value,
        vec![format!("{note} after {completed}/{total}")],
        confidence,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_propagates_before_and_then_runs() {
        let outcome: Outcome<i32> = Outcome::Cancelled;
        let mapped = outcome.and_then(|v| Outcome::Success(v + 1));
        assert!(mapped.is_cancelled());
    }

    #[test]
    fn warned_merges_warnings_and_takes_min_confidence() {
        let a = Outcome::Warned(Warned::new(1, vec!["a".into()], 0.5));
        let result = a.and_then(|v| Outcome::Warned(Warned::new(v + 1, vec!["b".into()], 0.8)));
        match result {
            Outcome::Warned(w) => {
                assert_eq!(w.value, 2);
                assert_eq!(w.warnings, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(w.confidence, 0.5);
            }
            _ => panic!("expected Warned"),
        }
    }

    #[test]
    fn partial_cancelled_with_zero_completed_is_cancelled() {
        let outcome: Outcome<Vec<i32>> = partial_cancelled(vec![], 0, 10, "cancelled");
        assert!(outcome.is_cancelled());
    }

    #[test]
    fn partial_cancelled_with_some_completed_is_warned_with_missing_ratio() {
        let outcome = partial_cancelled(vec![1, 2, 3, 4], 4, 10, "cancelled");
        match outcome {
            Outcome::Warned(w) => {
                assert_eq!(w.confidence, 0.4);
                assert!((w.missing_data_ratio - 0.6).abs() < 1e-9);
            }
            _ => panic!("expected Warned"),
        }
    }

    #[test]
    fn map_preserves_variant() {
        let failure: Outcome<i32> = Outcome::failure("boom");
        assert!(failure.map(|v| v + 1).is_failure());
    }
}
