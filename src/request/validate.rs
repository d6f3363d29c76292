//! Field-level validation failures.

use serde::{Deserialize, Serialize};

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    /// Field name (request-relative path).
    pub field: String,
    /// Human-readable rule description.
    pub message: String,
}

/// Accumulated validation failures for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailures {
    /// All failed rules, in declaration order.
    pub failures: Vec<FieldFailure>,
}

impl ValidationFailures {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.failures.push(FieldFailure {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns `true` if no rule failed.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), ValidationFailures> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Single-failure constructor.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut failures = Self::new();
        failures.push(field, message);
        failures
    }
}

impl std::fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for failure in &self.failures {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", failure.field, failure.message)?;
            first = false;
        }
        Ok(())
    }
}
