//! SDK connector trait and registry.
//!
//! A connector integrates one or more quantum SDKs. It compiles an
//! implementation for a QPU to measure the resulting circuit, and it runs
//! implementations on behalf of the dispatcher:
//!
//! ```text
//!   analyze() ──→ CircuitInformation        (selection, awaited inline)
//!   execute() ──→ ExecutionStore updates    (dispatch, background task)
//! ```
//!
//! ## Method table
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `supported_sdks()` | sync | yes | `&[String]` |
//! | `supported_providers()` | sync | provided | `Vec<String>` |
//! | `sdk_specific_parameters()` | sync | provided | `Vec<Parameter>` |
//! | `analyze()` | async | yes | `SelectorResult<Option<CircuitInformation>>` |
//! | `execute()` | async | yes | `SelectorResult<()>` |
//!
//! Connectors are looked up through a [`ConnectorRegistry`] built once at
//! startup. Each SDK name maps to exactly one connector.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::cancel::CancellationToken;
use crate::error::{SelectorError, SelectorResult};
use crate::execution::ExecutionId;
use crate::parameter::{Parameter, TypedParameters};
use crate::qpu::Qpu;
use crate::result::CircuitInformation;
use crate::store::ExecutionStore;

/// Everything a connector needs to run one execution.
///
/// The context is owned so it can move into a background task.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Where to fetch the implementation from.
    pub file_location: String,
    /// Target QPU.
    pub qpu: Qpu,
    /// Typed inputs.
    pub parameters: TypedParameters,
    /// Record to update while executing.
    pub execution: ExecutionId,
    /// Store holding the record.
    pub store: Arc<dyn ExecutionStore>,
    /// Set when the dispatcher shuts down.
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("file_location", &self.file_location)
            .field("qpu", &self.qpu.id)
            .field("execution", &self.execution)
            .finish_non_exhaustive()
    }
}

/// Integration with a quantum SDK.
///
/// # Contract
///
/// - `analyze()` returns `Ok(None)` when the compiler produced no
///   information at all, and `Ok(Some(info))` with
///   `transpilation_successful == false` when the implementation cannot be
///   expressed for the QPU. Both are non-fatal for selection.
/// - `execute()` owns the record after dispatch: it SHOULD move it to
///   `Running` and MUST eventually move it to `Finished` or `Failed` using
///   [`ExecutionStore::compare_and_set`]. Returning `Err` lets the dispatcher
///   mark the record `Failed` instead.
#[async_trait]
pub trait SdkConnector: Send + Sync {
    /// Unique name of the connector.
    fn name(&self) -> &str;

    /// SDK names this connector handles. Matching is case-sensitive.
    fn supported_sdks(&self) -> &[String];

    /// Providers whose QPUs this connector can reach.
    fn supported_providers(&self) -> Vec<String> {
        vec![]
    }

    /// Inputs the SDK needs regardless of the problem, e.g. an access token.
    fn sdk_specific_parameters(&self) -> Vec<Parameter> {
        vec![]
    }

    /// Compile the implementation for `qpu` and report the circuit it yields.
    async fn analyze(
        &self,
        file_location: &str,
        qpu: &Qpu,
        parameters: &TypedParameters,
    ) -> SelectorResult<Option<CircuitInformation>>;

    /// Run the implementation, updating the execution record as it goes.
    async fn execute(&self, context: ExecutionContext) -> SelectorResult<()>;
}

/// Maps SDK names to the connector handling them.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    by_sdk: FxHashMap<String, Arc<dyn SdkConnector>>,
    connectors: Vec<Arc<dyn SdkConnector>>,
}

impl ConnectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a fixed list of connectors.
    ///
    /// Fails if two connectors claim the same SDK or share a name.
    pub fn from_connectors(
        connectors: impl IntoIterator<Item = Arc<dyn SdkConnector>>,
    ) -> SelectorResult<Self> {
        let mut registry = Self::new();
        for connector in connectors {
            registry.register(connector)?;
        }
        Ok(registry)
    }

    /// Register a connector for all SDKs it supports.
    pub fn register(&mut self, connector: Arc<dyn SdkConnector>) -> SelectorResult<()> {
        if self.connectors.iter().any(|c| c.name() == connector.name()) {
            return Err(SelectorError::Configuration(format!(
                "connector {} registered twice",
                connector.name()
            )));
        }
        for sdk in connector.supported_sdks() {
            if let Some(existing) = self.by_sdk.get(sdk) {
                return Err(SelectorError::Configuration(format!(
                    "sdk {sdk} is claimed by both {} and {}",
                    existing.name(),
                    connector.name()
                )));
            }
        }
        for sdk in connector.supported_sdks() {
            self.by_sdk.insert(sdk.clone(), Arc::clone(&connector));
        }
        self.connectors.push(connector);
        Ok(())
    }

    /// Find the connector for an SDK.
    pub fn get(&self, sdk: &str) -> Option<&Arc<dyn SdkConnector>> {
        self.by_sdk.get(sdk)
    }

    /// Find the connector for an SDK, failing with
    /// [`SelectorError::NoConnector`] if none is registered.
    pub fn resolve(&self, sdk: &str) -> SelectorResult<Arc<dyn SdkConnector>> {
        self.get(sdk)
            .cloned()
            .ok_or_else(|| SelectorError::NoConnector(sdk.to_string()))
    }

    /// Registered connectors, in registration order.
    pub fn connectors(&self) -> &[Arc<dyn SdkConnector>] {
        &self.connectors
    }

    /// All SDK names with a connector, sorted.
    pub fn supported_sdks(&self) -> Vec<&str> {
        let mut sdks: Vec<_> = self.by_sdk.keys().map(String::as_str).collect();
        sdks.sort_unstable();
        sdks
    }

    /// SDK-specific parameters of every connector, in registration order.
    pub fn sdk_specific_parameters(&self) -> Vec<Parameter> {
        self.connectors
            .iter()
            .flat_map(|c| c.sdk_specific_parameters())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field(
                "connectors",
                &self.connectors.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("sdks", &self.supported_sdks())
            .finish()
    }
}
