//! Structured result channel for the filter boundary.
//!
//! Filters and the pipeline never let panics or bare errors cross the
//! boundary: every call returns either a value plus accumulated warnings,
//! or a list of coded errors. Warnings never block; any non-empty error
//! list is fatal for that call.

use serde::{Deserialize, Serialize};

use crate::mill_error::DataMillError;

/// A fatal condition, carried with a stable code and a human message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Stable signed code, unique per failure site.
    pub code: i32,
    /// Human-readable description.
    pub message: String,
}

impl ErrorMessage {
    /// Build an error message from a code and text.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<DataMillError> for ErrorMessage {
    fn from(err: DataMillError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// A non-fatal condition; accumulated and surfaced, never aborting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningMessage {
    /// Stable signed code.
    pub code: i32,
    /// Human-readable description.
    pub message: String,
}

impl WarningMessage {
    /// Build a warning message from a code and text.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A successful result value together with the warnings gathered on the way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Output<T> {
    /// The produced value.
    pub value: T,
    /// Warnings accumulated while producing it.
    pub warnings: Vec<WarningMessage>,
}

impl<T> Output<T> {
    /// Wrap a value with no warnings.
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Wrap a value with warnings.
    pub fn with_warnings(value: T, warnings: Vec<WarningMessage>) -> Self {
        Self { value, warnings }
    }

    /// Map the value, keeping the warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Output<U> {
        Output {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// The result type every filter-boundary call returns.
pub type MillResult<T = ()> = Result<Output<T>, Vec<ErrorMessage>>;

/// Shorthand for an ok result with no warnings.
pub fn ok<T>(value: T) -> MillResult<T> {
    Ok(Output::new(value))
}

/// Shorthand for a failed result from a single error.
pub fn fail<T>(error: impl Into<ErrorMessage>) -> MillResult<T> {
    Err(vec![error.into()])
}

/// Convert a plain store-layer result into a filter-boundary result.
pub fn lift<T>(res: Result<T, DataMillError>) -> MillResult<T> {
    match res {
        Ok(value) => ok(value),
        Err(err) => fail(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_preserves_code() {
        let err = DataMillError::Cancelled;
        let msg = ErrorMessage::from(err.clone());
        assert_eq!(msg.code, err.code());
        assert_eq!(msg.message, "execution cancelled");
    }

    #[test]
    fn output_map_keeps_warnings() {
        let out = Output::with_warnings(3usize, vec![WarningMessage::new(-900, "heads up")]);
        let mapped = out.map(|v| v * 2);
        assert_eq!(mapped.value, 6);
        assert_eq!(mapped.warnings.len(), 1);
    }

    #[test]
    fn serde_roundtrip() {
        let msg = ErrorMessage::new(-110, "no object found at `A/B`");
        let ser = serde_json::to_string(&msg).expect("serialize");
        let de: ErrorMessage = serde_json::from_str(&ser).expect("deserialize");
        assert_eq!(de, msg);
    }
}
