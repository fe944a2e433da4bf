//! Entry point combining selection and dispatch over one catalog.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::SelectorConfig;
use crate::connector::ConnectorRegistry;
use crate::dispatch::ExecutionDispatcher;
use crate::error::{SelectorError, SelectorResult};
use crate::execution::{ExecutionId, ExecutionResult};
use crate::implementation::{AlgorithmId, ImplementationId};
use crate::oracle::RuleOracle;
use crate::parameter::{Parameter, RawParameters};
use crate::qpu::QpuId;
use crate::result::AnalysisResult;
use crate::selection::Selector;
use crate::store::{Catalog, ExecutionStore};

/// Request to run an implementation on a QPU, addressed by catalog IDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub implementation_id: ImplementationId,
    pub qpu_id: QpuId,
    #[serde(default)]
    pub parameters: RawParameters,
    /// Depth from a previous selection, `0` if none.
    #[serde(default)]
    pub analysed_depth: u32,
    /// Width from a previous selection, `0` if none.
    #[serde(default)]
    pub analysed_width: u32,
}

/// Selection and dispatch sharing a catalog and connector registry.
#[derive(Clone)]
pub struct Analyzer {
    catalog: Arc<dyn Catalog>,
    selector: Selector,
    dispatcher: ExecutionDispatcher,
}

impl Analyzer {
    /// Wire up an analyzer. Fails if the config is invalid.
    pub fn new(
        config: SelectorConfig,
        catalog: Arc<dyn Catalog>,
        oracle: Arc<dyn RuleOracle>,
        connectors: ConnectorRegistry,
        store: Arc<dyn ExecutionStore>,
    ) -> SelectorResult<Self> {
        let connectors = Arc::new(connectors);
        let selector = Selector::new(Arc::clone(&catalog), oracle, Arc::clone(&connectors));
        let dispatcher = ExecutionDispatcher::new(store, connectors, config)?;
        Ok(Self {
            catalog,
            selector,
            dispatcher,
        })
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn dispatcher(&self) -> &ExecutionDispatcher {
        &self.dispatcher
    }

    /// See [`Selector::perform_selection`].
    pub async fn select(
        &self,
        algorithm: &AlgorithmId,
        parameters: &RawParameters,
    ) -> SelectorResult<Vec<AnalysisResult>> {
        self.selector.perform_selection(algorithm, parameters).await
    }

    /// See [`Selector::required_selection_parameters`].
    pub async fn selection_parameters(&self, algorithm: &AlgorithmId) -> SelectorResult<Vec<Parameter>> {
        self.selector.required_selection_parameters(algorithm).await
    }

    /// Resolve the IDs in `request` and dispatch it.
    pub async fn execute(&self, request: &ExecutionRequest) -> SelectorResult<ExecutionResult> {
        let implementation = self
            .catalog
            .implementation(&request.implementation_id)
            .await?
            .ok_or_else(|| SelectorError::ImplementationNotFound(request.implementation_id.clone()))
            .inspect_err(|e| error!("{}", e))?;
        let qpu = self
            .catalog
            .qpu(&request.qpu_id)
            .await?
            .ok_or_else(|| SelectorError::QpuNotFound(request.qpu_id.clone()))
            .inspect_err(|e| error!("{}", e))?;

        self.dispatcher
            .execute(
                &implementation,
                &qpu,
                &request.parameters,
                request.analysed_depth,
                request.analysed_width,
            )
            .await
    }

    /// Dispatch a pair returned by selection, carrying over its analysed
    /// depth and width.
    pub async fn execute_selected(
        &self,
        selected: &AnalysisResult,
        parameters: &RawParameters,
    ) -> SelectorResult<ExecutionResult> {
        self.dispatcher
            .execute(
                &selected.implementation,
                &selected.qpu,
                parameters,
                selected.analysed_depth,
                selected.analysed_width,
            )
            .await
    }

    /// Current state of an execution.
    pub async fn execution(&self, id: &ExecutionId) -> SelectorResult<ExecutionResult> {
        self.dispatcher.execution(id).await
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("selector", &self.selector)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
