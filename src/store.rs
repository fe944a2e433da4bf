//! Catalog and execution store abstractions.
//!
//! The selector reads implementations and QPUs from a [`Catalog`] and never
//! mutates them. Execution records live in an [`ExecutionStore`], which is
//! shared between the dispatcher and every running connector.
//!
//! In-memory implementations of both are provided for embedding and tests.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{SelectorError, SelectorResult};
use crate::execution::{ExecutionId, ExecutionResult, ExecutionStatus, ExecutionUpdate};
use crate::implementation::{AlgorithmId, Implementation, ImplementationId};
use crate::qpu::{Qpu, QpuId};

/// Read access to implementations and QPUs.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All implementations of an algorithm, in a stable order.
    async fn implementations_for_algorithm(
        &self,
        algorithm: &AlgorithmId,
    ) -> SelectorResult<Vec<Implementation>>;

    /// Load an implementation by ID.
    async fn implementation(&self, id: &ImplementationId) -> SelectorResult<Option<Implementation>>;

    /// Load a QPU by ID.
    async fn qpu(&self, id: &QpuId) -> SelectorResult<Option<Qpu>>;

    /// List all QPUs.
    async fn qpus(&self) -> SelectorResult<Vec<Qpu>>;
}

/// Storage for execution records.
///
/// Implementations MUST be safe to call concurrently from the dispatcher
/// and any number of connector tasks.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a new record. Fails if the ID already exists.
    async fn create(&self, record: ExecutionResult) -> SelectorResult<ExecutionResult>;

    /// Load a record by ID.
    async fn get(&self, id: &ExecutionId) -> SelectorResult<ExecutionResult>;

    /// List all records, oldest first.
    async fn list(&self) -> SelectorResult<Vec<ExecutionResult>>;

    /// Atomically apply `update` if the record is still in `expected`.
    ///
    /// Fails with [`SelectorError::StatusConflict`] if another writer moved
    /// the record first, and with [`SelectorError::InvalidTransition`] if
    /// the update breaks the state machine.
    async fn compare_and_set(
        &self,
        id: &ExecutionId,
        expected: ExecutionStatus,
        update: ExecutionUpdate,
    ) -> SelectorResult<ExecutionResult>;

    /// Move a pending record to `Failed`.
    ///
    /// Returns `None` if the record already reached a terminal status.
    async fn fail_pending(
        &self,
        id: &ExecutionId,
        message: &str,
    ) -> SelectorResult<Option<ExecutionResult>> {
        loop {
            let current = self.get(id).await?;
            if current.status.is_terminal() {
                return Ok(None);
            }
            match self
                .compare_and_set(id, current.status, ExecutionUpdate::failed(message))
                .await
            {
                Ok(record) => return Ok(Some(record)),
                Err(SelectorError::StatusConflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Catalog held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    implementations: RwLock<Vec<Implementation>>,
    qpus: RwLock<Vec<Qpu>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog from existing entries.
    pub fn with_entries(implementations: Vec<Implementation>, qpus: Vec<Qpu>) -> Self {
        Self {
            implementations: RwLock::new(implementations),
            qpus: RwLock::new(qpus),
        }
    }

    /// Insert or replace an implementation.
    pub async fn save_implementation(&self, implementation: Implementation) {
        let mut implementations = self.implementations.write().await;
        match implementations.iter_mut().find(|i| i.id == implementation.id) {
            Some(existing) => *existing = implementation,
            None => implementations.push(implementation),
        }
    }

    /// Insert or replace a QPU.
    pub async fn save_qpu(&self, qpu: Qpu) {
        let mut qpus = self.qpus.write().await;
        match qpus.iter_mut().find(|q| q.id == qpu.id) {
            Some(existing) => *existing = qpu,
            None => qpus.push(qpu),
        }
    }

    /// Remove a QPU. Returns whether it existed.
    pub async fn remove_qpu(&self, id: &QpuId) -> bool {
        let mut qpus = self.qpus.write().await;
        let before = qpus.len();
        qpus.retain(|q| &q.id != id);
        qpus.len() != before
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn implementations_for_algorithm(
        &self,
        algorithm: &AlgorithmId,
    ) -> SelectorResult<Vec<Implementation>> {
        Ok(self
            .implementations
            .read()
            .await
            .iter()
            .filter(|i| &i.implemented_algorithm == algorithm)
            .cloned()
            .collect())
    }

    async fn implementation(&self, id: &ImplementationId) -> SelectorResult<Option<Implementation>> {
        Ok(self
            .implementations
            .read()
            .await
            .iter()
            .find(|i| &i.id == id)
            .cloned())
    }

    async fn qpu(&self, id: &QpuId) -> SelectorResult<Option<Qpu>> {
        Ok(self.qpus.read().await.iter().find(|q| &q.id == id).cloned())
    }

    async fn qpus(&self) -> SelectorResult<Vec<Qpu>> {
        Ok(self.qpus.read().await.clone())
    }
}

/// Execution store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    records: RwLock<FxHashMap<ExecutionId, ExecutionResult>>,
}

impl InMemoryExecutionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, record: ExecutionResult) -> SelectorResult<ExecutionResult> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(SelectorError::Configuration(format!(
                "execution {} already exists",
                record.id
            )));
        }
        debug!(execution = %record.id, status = %record.status, "Created execution record");
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &ExecutionId) -> SelectorResult<ExecutionResult> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SelectorError::ExecutionNotFound(id.clone()))
    }

    async fn list(&self) -> SelectorResult<Vec<ExecutionResult>> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(records)
    }

    async fn compare_and_set(
        &self,
        id: &ExecutionId,
        expected: ExecutionStatus,
        update: ExecutionUpdate,
    ) -> SelectorResult<ExecutionResult> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| SelectorError::ExecutionNotFound(id.clone()))?;
        if record.status != expected {
            return Err(SelectorError::StatusConflict {
                expected,
                actual: record.status,
            });
        }
        let from = record.status;
        record.apply(update)?;
        debug!(execution = %id, %from, to = %record.status, "Updated execution record");
        Ok(record.clone())
    }
}
