//! Asynchronous execution dispatch.
//!
//! Dispatching returns as soon as the execution record exists; the connector
//! runs in a background task:
//!
//! ```text
//!   execute() ──→ create record (Initialized) ──→ return record
//!                        │
//!                        └──→ spawn ──→ wait for permit ──→ connector.execute()
//!                                                                 │
//!                                 Err / panic / cancelled ──→ record Failed
//! ```
//!
//! At most `max_concurrent_executions` connectors run at once. Dispatch
//! itself never waits for a permit.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::config::SelectorConfig;
use crate::connector::{ConnectorRegistry, ExecutionContext, SdkConnector};
use crate::error::{SelectorError, SelectorResult};
use crate::execution::{ExecutionId, ExecutionResult};
use crate::implementation::Implementation;
use crate::parameter::{RawParameters, infer_typed};
use crate::qpu::Qpu;
use crate::store::ExecutionStore;

/// Hands executions to connectors and tracks them in the store.
#[derive(Clone)]
pub struct ExecutionDispatcher {
    store: Arc<dyn ExecutionStore>,
    connectors: Arc<ConnectorRegistry>,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    cancel: CancellationToken,
    config: SelectorConfig,
}

impl ExecutionDispatcher {
    /// Create a dispatcher. Fails if the config is invalid.
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        connectors: Arc<ConnectorRegistry>,
        config: SelectorConfig,
    ) -> SelectorResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            connectors,
            permits: Arc::new(Semaphore::new(config.max_concurrent_executions)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
            config,
        })
    }

    /// Dispatch `implementation` on `qpu`.
    ///
    /// Returns the `Initialized` record without waiting for the connector.
    /// Fails fast, persisting nothing, if the dispatcher was cancelled, no
    /// connector handles the SDK, or a parameter does not match its
    /// declared type.
    pub async fn execute(
        &self,
        implementation: &Implementation,
        qpu: &Qpu,
        parameters: &RawParameters,
        analysed_depth: u32,
        analysed_width: u32,
    ) -> SelectorResult<ExecutionResult> {
        debug!(
            "Executing quantum algorithm implementation with Id: {} and name: {}",
            implementation.id, implementation.name
        );

        if self.cancel.is_cancelled() {
            warn!("Rejecting execution of {}: dispatcher is cancelled", implementation.name);
            return Err(SelectorError::Cancelled);
        }

        let connector = self.connectors.resolve(&implementation.sdk).inspect_err(|e| {
            error!("{}", e);
        })?;
        let typed = infer_typed(&implementation.input_parameters, parameters)?;

        let record = self
            .store
            .create(ExecutionResult::initialized(
                self.config.handoff_message.clone(),
                analysed_depth,
                analysed_width,
                qpu.clone(),
                implementation.clone(),
                parameters.clone(),
            ))
            .await?;

        let context = ExecutionContext {
            file_location: implementation.file_location.clone(),
            qpu: qpu.clone(),
            parameters: typed,
            execution: record.id.clone(),
            store: Arc::clone(&self.store),
            cancel: self.cancel.clone(),
        };
        self.spawn(connector, context);

        info!(
            execution = %record.id,
            "Passed implementation {} on QPU {} to connector",
            implementation.name, qpu.name
        );
        Ok(record)
    }

    fn spawn(&self, connector: Arc<dyn SdkConnector>, context: ExecutionContext) {
        let permits = Arc::clone(&self.permits);
        let in_flight = Arc::clone(&self.in_flight);
        let cancel = self.cancel.clone();
        let store = Arc::clone(&self.store);
        let id = context.execution.clone();

        tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = permits.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit.filter(|_| !cancel.is_cancelled()) else {
                let message = format!("{} before it started.", SelectorError::Cancelled);
                warn!(execution = %id, "{}", message);
                mark_failed(store.as_ref(), &id, &message).await;
                return;
            };

            in_flight.fetch_add(1, Ordering::Relaxed);
            let outcome = tokio::spawn(async move { connector.execute(context).await }).await;
            in_flight.fetch_sub(1, Ordering::Relaxed);

            match outcome {
                Ok(Ok(())) => debug!(execution = %id, "Connector returned"),
                Ok(Err(e)) => {
                    error!(execution = %id, "Connector failed: {}", e);
                    let message = match &e {
                        SelectorError::Execution(_) => e.to_string(),
                        other => SelectorError::Execution(other.to_string()).to_string(),
                    };
                    mark_failed(store.as_ref(), &id, &message).await;
                }
                Err(join) => {
                    error!(execution = %id, "Connector task aborted: {}", join);
                    mark_failed(store.as_ref(), &id, "Execution aborted unexpectedly.").await;
                }
            }
        });
    }

    /// Current state of an execution.
    pub async fn execution(&self, id: &ExecutionId) -> SelectorResult<ExecutionResult> {
        self.store.get(id).await
    }

    /// Poll until the execution reaches a terminal status.
    ///
    /// Uses the configured poll interval and timeout.
    pub async fn wait(&self, id: &ExecutionId) -> SelectorResult<ExecutionResult> {
        let deadline = Instant::now() + self.config.wait_timeout();
        loop {
            let record = self.store.get(id).await?;
            if record.status.is_terminal() {
                return Ok(record);
            }
            if Instant::now() >= deadline {
                return Err(SelectorError::Timeout(id.clone()));
            }
            sleep(self.config.poll_interval()).await;
        }
    }

    /// Signal cancellation to queued and running executions.
    ///
    /// Queued executions are marked `Failed`; running connectors observe the
    /// token and decide themselves.
    pub fn cancel(&self) {
        info!("Cancelling pending executions");
        self.cancel.cancel();
    }

    /// The token handed to every connector.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Number of connectors currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Number of executions that can start right now.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }
}

impl std::fmt::Debug for ExecutionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionDispatcher")
            .field("connectors", &self.connectors)
            .field("in_flight", &self.in_flight())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn mark_failed(store: &dyn ExecutionStore, id: &ExecutionId, message: &str) {
    match store.fail_pending(id, message).await {
        Ok(Some(_)) => debug!(execution = %id, "Marked execution as failed"),
        Ok(None) => debug!(execution = %id, "Execution already terminal"),
        Err(e) => error!(execution = %id, "Unable to mark execution as failed: {}", e),
    }
}
