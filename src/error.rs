//! Selector error types.
//!
//! Errors are categorized by who has to act on them:
//!
//! | Category | Variants | Recovery |
//! |----------|----------|----------|
//! | **Configuration** | `NoConnector`, `Configuration` | Fix connector registration or config |
//! | **Lookup** | `ImplementationNotFound`, `QpuNotFound`, `ExecutionNotFound` | Fix caller input |
//! | **State** | `InvalidTransition`, `StatusConflict` | Re-read the record and retry |
//! | **Oracle** | `RuleEvaluation`, `Compilation` | Isolated per implementation or QPU |
//! | **Parameter** | `InvalidParameter` | Fix input values |
//! | **Dispatch** | `Cancelled`, `Execution`, `Timeout` | Recorded on the execution record |
//! | **I/O** | `Io`, `Json` | Fix config file |
//!
//! Expected infeasibility (a rule rejecting parameters, an empty shortlist,
//! a failed transpilation, a capacity gate) is never represented here.

use thiserror::Error;

use crate::execution::{ExecutionId, ExecutionStatus};
use crate::implementation::ImplementationId;
use crate::qpu::QpuId;

/// Errors that can occur during selection and dispatch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SelectorError {
    // ── Configuration errors ─────────────────────────────────────────
    /// No connector is registered for the SDK.
    #[error("Unable to find connector plugin for sdk name {0}")]
    NoConnector(String),

    /// Invalid configuration or connector registration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── Lookup errors ────────────────────────────────────────────────
    /// Implementation is not in the catalog.
    #[error("Implementation not found: {0}")]
    ImplementationNotFound(ImplementationId),

    /// QPU is not in the catalog.
    #[error("QPU not found: {0}")]
    QpuNotFound(QpuId),

    /// Execution record is not in the store.
    #[error("Execution not found: {0}")]
    ExecutionNotFound(ExecutionId),

    // ── State errors ─────────────────────────────────────────────────
    /// Status change violates the execution state machine.
    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// Compare-and-set lost against a concurrent writer.
    #[error("Status conflict: expected {expected}, found {actual}")]
    StatusConflict {
        expected: ExecutionStatus,
        actual: ExecutionStatus,
    },

    // ── Oracle errors ────────────────────────────────────────────────
    /// Rule oracle could not evaluate a rule.
    #[error("Rule evaluation failed: {0}")]
    RuleEvaluation(String),

    /// Compiler oracle failed unexpectedly.
    #[error("Compilation failed: {0}")]
    Compilation(String),

    // ── Parameter errors ─────────────────────────────────────────────
    /// A raw value does not match the declared parameter type.
    #[error("Invalid value {value:?} for parameter {name}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    // ── Dispatch errors ──────────────────────────────────────────────
    /// Execution was cancelled before it finished.
    #[error("Execution cancelled")]
    Cancelled,

    /// Connector failed while executing.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Execution did not reach a terminal status in time.
    #[error("Timeout waiting for execution {0}")]
    Timeout(ExecutionId),

    // ── I/O errors ───────────────────────────────────────────────────
    /// Reading a config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SelectorError {
    /// Returns `true` if the error stems from how the selector was set up
    /// rather than from a particular request.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoConnector(_) | Self::Configuration(_))
    }

    /// Returns `true` if the error came from an external oracle and should
    /// only drop the affected implementation or QPU.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, Self::RuleEvaluation(_) | Self::Compilation(_))
    }
}

/// Result type for selector operations.
pub type SelectorResult<T> = Result<T, SelectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(SelectorError::NoConnector("qiskit".into()).is_configuration());
        assert!(SelectorError::Configuration("dup".into()).is_configuration());
        assert!(!SelectorError::Cancelled.is_configuration());
        assert!(!SelectorError::Compilation("boom".into()).is_configuration());
    }

    #[test]
    fn test_oracle_failures() {
        assert!(SelectorError::RuleEvaluation("syntax".into()).is_oracle_failure());
        assert!(SelectorError::Compilation("timeout".into()).is_oracle_failure());
        assert!(!SelectorError::NoConnector("forest".into()).is_oracle_failure());
    }

    #[test]
    fn test_error_display() {
        let err = SelectorError::NoConnector("pytket".into());
        assert_eq!(
            err.to_string(),
            "Unable to find connector plugin for sdk name pytket"
        );

        let err = SelectorError::InvalidTransition {
            from: ExecutionStatus::Finished,
            to: ExecutionStatus::Running,
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition FINISHED -> RUNNING"
        );
    }
}
