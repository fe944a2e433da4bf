//! QPU Selector: matching algorithm implementations to quantum hardware.
//!
//! Given an algorithm and runtime parameters, this crate finds every
//! (implementation, QPU) pair that can actually run the algorithm, and
//! dispatches a chosen pair to an SDK connector in the background.
//!
//! # Overview
//!
//! The crate defines:
//! - [`Selector`]: the selection pipeline
//! - [`ExecutionDispatcher`]: bounded, fire-and-forget execution
//! - [`RuleOracle`]: the rule engine seam (feasibility, estimates, shortlist)
//! - [`SdkConnector`] / [`ConnectorRegistry`]: compiler and executor seam
//! - [`Catalog`] / [`ExecutionStore`]: storage seams with in-memory defaults
//! - [`AnalysisResult`] / [`ExecutionResult`]: what callers get back
//! - [`SelectorError`] with categorized variants
//!
//! # Selection
//!
//! ```text
//!   params ──→ filter ──→ estimate ──→ shortlist ──→ compile ──→ capacity gates ──→ results
//!              (rules)    (rules)      (oracle)      (connector)  (qubits, T1/gate time)
//! ```
//!
//! When no connector exists for an implementation's SDK, or the connector
//! yields no information, rule estimates stand in for measurements and the
//! result is flagged with `estimate = true`.
//!
//! # Dispatch
//!
//! ```text
//!   execute() ──→ Initialized ──→ Running ──→ Finished | Failed
//!    (returns here)   (connector updates via compare-and-set)
//! ```

pub mod analyzer;
pub mod cancel;
pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod implementation;
pub mod oracle;
pub mod parameter;
pub mod qpu;
pub mod result;
pub mod selection;
pub mod store;

pub use analyzer::{Analyzer, ExecutionRequest};
pub use cancel::CancellationToken;
pub use config::SelectorConfig;
pub use connector::{ConnectorRegistry, ExecutionContext, SdkConnector};
pub use dispatch::ExecutionDispatcher;
pub use error::{SelectorError, SelectorResult};
pub use execution::{ExecutionId, ExecutionResult, ExecutionStatus, ExecutionUpdate};
pub use implementation::{AlgorithmId, Implementation, ImplementationId, Rule};
pub use oracle::{RuleKind, RuleOracle};
pub use parameter::{DataType, Parameter, ParameterValue, RawParameters, TypedParameters};
pub use qpu::{CapacityCheck, Qpu, QpuId};
pub use result::{AnalysisResult, CircuitInformation};
pub use selection::{Estimate, Selector};
pub use store::{Catalog, ExecutionStore, InMemoryCatalog, InMemoryExecutionStore};
