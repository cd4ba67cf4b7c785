//! Field-level validation: validators, failures, and mergeable results.
//!
//! Validators for a request type are independent and order-insensitive. The
//! validation behavior runs all of them and merges the results so the caller
//! gets complete feedback in one round trip rather than stopping at the first
//! failing validator.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FieldFailure
// ---------------------------------------------------------------------------

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    /// Name of the offending field (e.g. `"name"`).
    pub field: String,
    /// Stable machine-readable error code (e.g. `"required"`).
    pub code: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl FieldFailure {
    /// Create a failure for the given field.
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// The outcome of running one or more validators: a set of field failures.
///
/// An empty set means the value is valid. Results merge in order, so the
/// failure list preserves the order validators reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    failures: Vec<FieldFailure>,
}

impl ValidationResult {
    /// A passing result with no failures.
    #[must_use]
    pub fn valid() -> Self {
        Self::default()
    }

    /// A result with a single field failure.
    #[must_use]
    pub fn failure(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            failures: vec![FieldFailure::new(field, code, message)],
        }
    }

    /// Append a failure to this result.
    pub fn push(&mut self, failure: FieldFailure) {
        self.failures.push(failure);
    }

    /// Absorb another result's failures, preserving order.
    pub fn merge(&mut self, other: ValidationResult) {
        self.failures.extend(other.failures);
    }

    /// Whether no validator reported a failure.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// The accumulated failures.
    #[must_use]
    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// Consume the result, yielding the accumulated failures.
    #[must_use]
    pub fn into_failures(self) -> Vec<FieldFailure> {
        self.failures
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "valid");
        }
        write!(f, "{} field failure(s):", self.failures.len())?;
        for failure in &self.failures {
            write!(f, " {}[{}]", failure.field, failure.code)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validates a request value before its handler runs.
///
/// Validators never short-circuit each other: all validators registered for a
/// request type run, and their results merge.
pub trait Validator<R>: Send + Sync {
    /// Inspect the request and report any field failures.
    fn validate(&self, request: &R) -> ValidationResult;
}

/// Plain functions and closures are validators.
impl<R, F> Validator<R> for F
where
    F: Fn(&R) -> ValidationResult + Send + Sync,
{
    fn validate(&self, request: &R) -> ValidationResult {
        self(request)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
