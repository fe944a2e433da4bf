//! Selection and dispatch against an in-memory catalog.
//!
//! This demo registers a mock connector that "compiles" a Shor circuit by
//! deriving its size from `N`, selects QPUs for it, and runs the
//! implementation on the first QPU found.

use std::sync::Arc;

use async_trait::async_trait;
use qpu_selector::{
    AlgorithmId, Analyzer, CircuitInformation, ConnectorRegistry, ExecutionContext,
    ExecutionStatus, ExecutionUpdate, ImplementationId, Implementation, InMemoryCatalog,
    InMemoryExecutionStore, Parameter, Qpu, QpuId, RawParameters, Rule, RuleKind, RuleOracle,
    SdkConnector, SelectorConfig, SelectorError, SelectorResult, TypedParameters,
};

/// Connector that sizes circuits from the bit length of `N`.
struct MockConnector {
    sdks: Vec<String>,
}

impl MockConnector {
    fn new() -> Self {
        Self {
            sdks: vec!["qiskit".into()],
        }
    }
}

fn bit_length(n: i64) -> u32 {
    64 - n.max(1).leading_zeros()
}

#[async_trait]
impl SdkConnector for MockConnector {
    fn name(&self) -> &str {
        "mock-qiskit"
    }

    fn supported_sdks(&self) -> &[String] {
        &self.sdks
    }

    fn sdk_specific_parameters(&self) -> Vec<Parameter> {
        vec![Parameter::string("token").with_description("Provider access token")]
    }

    async fn analyze(
        &self,
        _file_location: &str,
        qpu: &Qpu,
        parameters: &TypedParameters,
    ) -> SelectorResult<Option<CircuitInformation>> {
        let Some(n) = parameters.get("N").and_then(|v| v.as_integer()) else {
            return Ok(Some(CircuitInformation::failed("N is not an integer")));
        };
        let bits = bit_length(n);
        let depth = if qpu.is_simulator { 8 * bits } else { 12 * bits };
        Ok(Some(CircuitInformation::transpiled(2 * bits + 3, depth)))
    }

    async fn execute(&self, context: ExecutionContext) -> SelectorResult<()> {
        let store = &context.store;
        store
            .compare_and_set(
                &context.execution,
                ExecutionStatus::Initialized,
                ExecutionUpdate::running("Executing on mock backend."),
            )
            .await?;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        store
            .compare_and_set(
                &context.execution,
                ExecutionStatus::Running,
                ExecutionUpdate::finished(serde_json::json!({"0011": 498, "1100": 526})),
            )
            .await?;
        Ok(())
    }
}

/// Oracle whose estimate rules are plain numbers and whose shortlist is
/// every QPU wide enough for the estimate.
struct StaticOracle {
    qpus: Vec<Qpu>,
}

impl RuleOracle for StaticOracle {
    fn is_feasible(&self, rule: &Rule, parameters: &RawParameters) -> SelectorResult<bool> {
        match rule.as_str() {
            "odd N" => Ok(parameters
                .get("N")
                .and_then(|n| n.parse::<i64>().ok())
                .is_some_and(|n| n % 2 == 1)),
            other => Err(SelectorError::RuleEvaluation(format!("unknown rule {other}"))),
        }
    }

    fn estimate(&self, rule: &Rule, _parameters: &RawParameters) -> SelectorResult<u32> {
        rule.as_str()
            .parse()
            .map_err(|_| SelectorError::RuleEvaluation(format!("not a number: {rule}")))
    }

    fn shortlist(
        &self,
        _implementation: &ImplementationId,
        estimated_width: u32,
        _estimated_depth: u32,
    ) -> SelectorResult<Vec<QpuId>> {
        Ok(self
            .qpus
            .iter()
            .filter(|q| q.qubit_count >= estimated_width)
            .map(|q| q.id.clone())
            .collect())
    }

    fn referenced_parameters(&self, rule: &Rule, kind: RuleKind) -> Vec<String> {
        if kind == RuleKind::Selection && rule.as_str().contains('N') {
            vec!["N".into()]
        } else {
            vec![]
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let qpus = vec![
        Qpu::new("ibmq_lima", "ibmq_lima", 5, 80_000.0, 400.0).with_provider("ibmq"),
        Qpu::new("ibmq_guadalupe", "ibmq_guadalupe", 16, 90_000.0, 300.0).with_provider("ibmq"),
        Qpu::simulator("qasm_simulator", "qasm_simulator", 32).with_provider("ibmq"),
    ];
    let implementations = vec![
        Implementation::new("shor-15", "shor", "Shor-15", "qiskit", "https://repo/shor15.py")
            .with_parameter(Parameter::integer("N"))
            .with_selection_rule("odd N")
            .with_width_rule("11")
            .with_depth_rule("40"),
        Implementation::new("shor-cirq", "shor", "Shor-Cirq", "cirq", "https://repo/shor.cirq")
            .with_parameter(Parameter::integer("N"))
            .with_width_rule("12")
            .with_depth_rule("60"),
    ];

    let analyzer = Analyzer::new(
        SelectorConfig::default(),
        Arc::new(InMemoryCatalog::with_entries(implementations, qpus.clone())),
        Arc::new(StaticOracle { qpus }),
        ConnectorRegistry::from_connectors([Arc::new(MockConnector::new()) as Arc<dyn SdkConnector>])?,
        Arc::new(InMemoryExecutionStore::new()),
    )?;

    let algorithm = AlgorithmId::from("shor");
    println!("Parameters required for {algorithm}:");
    for p in analyzer.selection_parameters(&algorithm).await? {
        println!("  {} ({})", p.name, p.data_type);
    }
    println!();

    let params: RawParameters = [("N".to_string(), "15".to_string())].into_iter().collect();
    let selected = analyzer.select(&algorithm, &params).await?;
    println!("Candidates:");
    for r in &selected {
        println!(
            "  {:<10} on {:<16} width {:>2} depth {:>3}{}",
            r.implementation.name,
            r.qpu.name,
            r.analysed_width,
            r.analysed_depth,
            if r.estimate { " (estimate)" } else { "" }
        );
    }
    println!();

    let Some(first) = selected.iter().find(|r| !r.estimate) else {
        println!("No measured candidate to execute");
        return Ok(());
    };
    let record = analyzer.execute_selected(first, &params).await?;
    println!("Execution {}: {}", record.id, record.status);

    let done = analyzer.dispatcher().wait(&record.id).await?;
    println!("Execution {}: {} ({})", done.id, done.status, done.status_code);
    if let Some(result) = done.result {
        println!("Result: {result}");
    }

    Ok(())
}
