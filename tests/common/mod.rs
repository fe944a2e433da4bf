//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use qpu_selector::{
    CircuitInformation, ExecutionContext, ExecutionStatus, ExecutionUpdate, ImplementationId, Qpu,
    QpuId, RawParameters, Rule, RuleKind, RuleOracle, SdkConnector, SelectorError, SelectorResult,
    TypedParameters,
};
use rustc_hash::FxHashMap;
use tokio::sync::Semaphore;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn params(pairs: &[(&str, &str)]) -> RawParameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Oracle backed by lookup tables.
///
/// Selection rules `accept` and `reject` evaluate to true and false; any
/// other selection rule fails. Estimates are looked up by rule text.
/// Shortlisting fails for implementations registered as unreachable.
#[derive(Debug, Default)]
pub struct TableOracle {
    estimates: FxHashMap<String, u32>,
    shortlists: FxHashMap<ImplementationId, Vec<QpuId>>,
    unreachable: Vec<ImplementationId>,
}

impl TableOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_estimate(mut self, rule: &str, value: u32) -> Self {
        self.estimates.insert(rule.to_string(), value);
        self
    }

    pub fn with_shortlist(mut self, implementation: &str, qpus: &[&str]) -> Self {
        self.shortlists.insert(
            ImplementationId::from(implementation),
            qpus.iter().map(|q| QpuId::from(*q)).collect(),
        );
        self
    }

    pub fn with_failing_shortlist(mut self, implementation: &str) -> Self {
        self.unreachable.push(ImplementationId::from(implementation));
        self
    }
}

impl RuleOracle for TableOracle {
    fn is_feasible(&self, rule: &Rule, _parameters: &RawParameters) -> SelectorResult<bool> {
        match rule.as_str() {
            "accept" => Ok(true),
            "reject" => Ok(false),
            other => Err(SelectorError::RuleEvaluation(format!("unknown rule {other}"))),
        }
    }

    fn estimate(&self, rule: &Rule, _parameters: &RawParameters) -> SelectorResult<u32> {
        self.estimates
            .get(rule.as_str())
            .copied()
            .ok_or_else(|| SelectorError::RuleEvaluation(format!("no estimate for {rule}")))
    }

    fn shortlist(
        &self,
        implementation: &ImplementationId,
        _estimated_width: u32,
        _estimated_depth: u32,
    ) -> SelectorResult<Vec<QpuId>> {
        if self.unreachable.contains(implementation) {
            return Err(SelectorError::RuleEvaluation(format!(
                "shortlist query for {implementation} timed out"
            )));
        }
        Ok(self.shortlists.get(implementation).cloned().unwrap_or_default())
    }

    fn referenced_parameters(&self, _rule: &Rule, _kind: RuleKind) -> Vec<String> {
        vec![]
    }
}

/// What [`CompilingConnector`] reports for one QPU.
#[derive(Debug, Clone)]
pub enum Compiled {
    Info(CircuitInformation),
    Nothing,
    Error,
}

/// Connector whose analysis answers come from a table keyed by QPU.
/// Unlisted QPUs yield no information.
#[derive(Debug)]
pub struct CompilingConnector {
    sdks: Vec<String>,
    outcomes: FxHashMap<QpuId, Compiled>,
    calls: AtomicUsize,
}

impl CompilingConnector {
    pub fn new(sdk: &str) -> Self {
        Self {
            sdks: vec![sdk.to_string()],
            outcomes: FxHashMap::default(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_outcome(mut self, qpu: &str, outcome: Compiled) -> Self {
        self.outcomes.insert(QpuId::from(qpu), outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SdkConnector for CompilingConnector {
    fn name(&self) -> &str {
        "compiling"
    }

    fn supported_sdks(&self) -> &[String] {
        &self.sdks
    }

    async fn analyze(
        &self,
        _file_location: &str,
        qpu: &Qpu,
        _parameters: &TypedParameters,
    ) -> SelectorResult<Option<CircuitInformation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.get(&qpu.id) {
            Some(Compiled::Info(info)) => Ok(Some(info.clone())),
            Some(Compiled::Error) => Err(SelectorError::Compilation("transpiler crashed".into())),
            Some(Compiled::Nothing) | None => Ok(None),
        }
    }

    async fn execute(&self, _context: ExecutionContext) -> SelectorResult<()> {
        Ok(())
    }
}

/// Connector whose executions block until the test opens the gate.
///
/// Each opened slot lets one execution finish. Executions observe the
/// cancellation token and mark themselves failed when it fires.
#[derive(Debug)]
pub struct GatedConnector {
    sdks: Vec<String>,
    gate: Semaphore,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl GatedConnector {
    pub fn new(sdk: &str) -> Self {
        Self {
            sdks: vec![sdk.to_string()],
            gate: Semaphore::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn open(&self, slots: usize) {
        self.gate.add_permits(slots);
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SdkConnector for GatedConnector {
    fn name(&self) -> &str {
        "gated"
    }

    fn supported_sdks(&self) -> &[String] {
        &self.sdks
    }

    async fn analyze(
        &self,
        _file_location: &str,
        _qpu: &Qpu,
        _parameters: &TypedParameters,
    ) -> SelectorResult<Option<CircuitInformation>> {
        Ok(None)
    }

    async fn execute(&self, context: ExecutionContext) -> SelectorResult<()> {
        context
            .store
            .compare_and_set(
                &context.execution,
                ExecutionStatus::Initialized,
                ExecutionUpdate::running("Executing on simulator."),
            )
            .await?;
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let update = tokio::select! {
            permit = self.gate.acquire() => match permit {
                Ok(permit) => {
                    permit.forget();
                    ExecutionUpdate::finished(serde_json::json!({"00": 512, "11": 512}))
                }
                Err(_) => ExecutionUpdate::failed("Gate closed."),
            },
            _ = context.cancel.cancelled() => ExecutionUpdate::failed("Execution cancelled."),
        };
        self.running.fetch_sub(1, Ordering::SeqCst);

        context
            .store
            .compare_and_set(&context.execution, ExecutionStatus::Running, update)
            .await?;
        Ok(())
    }
}
