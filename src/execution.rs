//! Execution records and their lifecycle.
//!
//! The execution state machine:
//!
//! ```text
//!   dispatch() ──→ Initialized ───→ Running ───→ Finished
//!                      │  │            │            ↑
//!                      │  └────────────┼────────────┘
//!                      │               │
//!                      └───────────────┴──→ Failed
//! ```
//!
//! **Invariants:**
//! - The dispatcher creates every record in `Initialized`.
//! - Transitions are monotonic: a record never moves backward.
//! - Terminal states (`Finished`, `Failed`) are permanent.
//! - After creation, records change only through
//!   [`ExecutionStore::compare_and_set`](crate::store::ExecutionStore::compare_and_set).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{SelectorError, SelectorResult};
use crate::implementation::Implementation;
use crate::parameter::RawParameters;
use crate::qpu::Qpu;

/// Unique identifier for an execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    /// Generate a fresh execution ID.
    pub fn generate() -> Self {
        Self(format!("exec_{}", Ulid::new()))
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Record created, connector not yet started.
    Initialized,
    /// Connector is executing.
    Running,
    /// Execution completed and the result is attached.
    Finished,
    /// Execution failed; the status message says why.
    Failed,
}

impl ExecutionStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Finished | ExecutionStatus::Failed)
    }

    /// Check if the execution is still pending.
    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }

    /// Check whether moving to `next` respects the state machine.
    ///
    /// Staying in the same non-terminal state is allowed so that connectors
    /// can update the message or attach partial results.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        match (*self, next) {
            (Initialized, Initialized | Running | Finished | Failed) => true,
            (Running, Running | Finished | Failed) => true,
            (Finished | Failed, _) => false,
            (Running, Initialized) => false,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Initialized => write!(f, "INITIALIZED"),
            ExecutionStatus::Running => write!(f, "RUNNING"),
            ExecutionStatus::Finished => write!(f, "FINISHED"),
            ExecutionStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Tracked state of one execution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: ExecutionId,
    pub status: ExecutionStatus,
    /// Human-readable status message.
    pub status_code: String,
    /// Depth the caller analysed before dispatching (0 if unanalysed).
    pub analysed_depth: u32,
    /// Width the caller analysed before dispatching (0 if unanalysed).
    pub analysed_width: u32,
    pub qpu: Qpu,
    pub executed_implementation: Implementation,
    /// Inputs exactly as the caller supplied them.
    pub input_parameters: RawParameters,
    /// Opaque connector output, set once available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Create a record in `Initialized`.
    pub fn initialized(
        message: impl Into<String>,
        analysed_depth: u32,
        analysed_width: u32,
        qpu: Qpu,
        implementation: Implementation,
        input_parameters: RawParameters,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ExecutionId::generate(),
            status: ExecutionStatus::Initialized,
            status_code: message.into(),
            analysed_depth,
            analysed_width,
            qpu,
            executed_implementation: implementation,
            input_parameters,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update, enforcing the state machine.
    pub fn apply(&mut self, update: ExecutionUpdate) -> SelectorResult<()> {
        if !self.status.can_transition_to(update.status) {
            return Err(SelectorError::InvalidTransition {
                from: self.status,
                to: update.status,
            });
        }
        self.status = update.status;
        if let Some(message) = update.message {
            self.status_code = message;
        }
        if let Some(result) = update.result {
            self.result = Some(result);
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Change requested by a connector or the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionUpdate {
    pub status: ExecutionStatus,
    pub message: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl ExecutionUpdate {
    /// Move to `status` without touching message or result.
    pub fn status(status: ExecutionStatus) -> Self {
        Self {
            status,
            message: None,
            result: None,
        }
    }

    /// Mark the execution as running.
    pub fn running(message: impl Into<String>) -> Self {
        Self::status(ExecutionStatus::Running).with_message(message)
    }

    /// Mark the execution as finished with its output.
    pub fn finished(result: serde_json::Value) -> Self {
        Self {
            status: ExecutionStatus::Finished,
            message: Some("Execution successfully completed.".into()),
            result: Some(result),
        }
    }

    /// Mark the execution as failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::status(ExecutionStatus::Failed).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
