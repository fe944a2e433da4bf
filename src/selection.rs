//! Implementation and QPU selection.
//!
//! Selection runs as a pipeline, one implementation at a time:
//!
//! ```text
//!   catalog ──→ candidate filter ──→ estimator ──→ shortlist ──→ refiner ──→ Vec<AnalysisResult>
//!               (params + rule)      (width/depth)  (oracle)     (compile + capacity gates)
//! ```
//!
//! Expected infeasibility at any stage drops the implementation or QPU
//! silently. Oracle failures drop only the implementation they occurred for;
//! the run continues with the rest. Results come out in catalog order, then
//! shortlist order, and are not ranked.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::connector::{ConnectorRegistry, SdkConnector};
use crate::error::SelectorResult;
use crate::implementation::{AlgorithmId, Implementation, Rule};
use crate::oracle::{RuleKind, RuleOracle};
use crate::parameter::{DataType, Parameter, RawParameters, TypedParameters, infer_typed};
use crate::qpu::{CapacityCheck, Qpu};
use crate::result::AnalysisResult;
use crate::store::Catalog;

/// Width and depth derived from an implementation's rules.
///
/// A value of `0` means the rule is absent, not that the circuit is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Estimate {
    pub width: u32,
    pub depth: u32,
}

impl Estimate {
    /// Check whether both numbers are present and can stand in for a
    /// measurement.
    pub fn is_usable(&self) -> bool {
        self.width != 0 && self.depth != 0
    }
}

/// Selects (implementation, QPU) pairs able to run an algorithm.
#[derive(Clone)]
pub struct Selector {
    catalog: Arc<dyn Catalog>,
    oracle: Arc<dyn RuleOracle>,
    connectors: Arc<ConnectorRegistry>,
}

impl Selector {
    /// Create a selector.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        oracle: Arc<dyn RuleOracle>,
        connectors: Arc<ConnectorRegistry>,
    ) -> Self {
        Self {
            catalog,
            oracle,
            connectors,
        }
    }

    /// Registered connectors.
    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    /// Return every (implementation, QPU) pair that can run `algorithm` with
    /// the supplied parameters.
    ///
    /// Only a failing catalog aborts the run. Everything else either drops
    /// the affected implementation or QPU or falls back to estimates.
    pub async fn perform_selection(
        &self,
        algorithm: &AlgorithmId,
        parameters: &RawParameters,
    ) -> SelectorResult<Vec<AnalysisResult>> {
        info!("Performing implementation and QPU selection for algorithm {}", algorithm);

        let executable = self.executable_implementations(algorithm, parameters).await?;

        let mut results = Vec::new();
        for implementation in &executable {
            match self.analyze_implementation(implementation, parameters).await {
                Ok(found) => results.extend(found),
                Err(e) => warn!(
                    implementation = %implementation.id,
                    "Skipping implementation {} for the selection: {}",
                    implementation.name,
                    e
                ),
            }
        }

        info!(
            "Selection for algorithm {} returned {} candidate(s)",
            algorithm,
            results.len()
        );
        Ok(results)
    }

    /// Implementations of `algorithm` whose required parameters are all
    /// supplied and whose selection rule (if any) accepts them.
    pub async fn executable_implementations(
        &self,
        algorithm: &AlgorithmId,
        parameters: &RawParameters,
    ) -> SelectorResult<Vec<Implementation>> {
        let implementations = self.catalog.implementations_for_algorithm(algorithm).await?;
        debug!("Found {} implementations for the algorithm", implementations.len());

        let executable: Vec<_> = implementations
            .into_iter()
            .filter(|implementation| self.is_executable(implementation, parameters))
            .collect();

        debug!(
            "{} implementations are executable for the given input parameters after applying the selection rules",
            executable.len()
        );
        Ok(executable)
    }

    fn is_executable(&self, implementation: &Implementation, parameters: &RawParameters) -> bool {
        let required = self.required_parameters(implementation);
        if let Some(missing) = required.iter().find(|name| !parameters.contains_key(*name)) {
            debug!(
                "Implementation {} requires parameter {} which was not supplied",
                implementation.name, missing
            );
            return false;
        }

        let Some(rule) = &implementation.selection_rule else {
            return true;
        };
        match self.oracle.is_feasible(rule, parameters) {
            Ok(feasible) => {
                if !feasible {
                    debug!("Selection rule rejects implementation {}", implementation.name);
                }
                feasible
            }
            Err(e) => {
                warn!(
                    "Unable to evaluate selection rule of implementation {}: {}",
                    implementation.name, e
                );
                false
            }
        }
    }

    /// Names an implementation needs: its declared inputs followed by every
    /// name its rules read, without duplicates.
    pub fn required_parameters(&self, implementation: &Implementation) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let declared = implementation.input_parameters.iter().map(|p| p.name.clone());
        let referenced = rule_slots(implementation)
            .into_iter()
            .filter_map(|(rule, kind)| rule.map(|r| (r, kind)))
            .flat_map(|(rule, kind)| self.oracle.referenced_parameters(rule, kind));

        for name in declared.chain(referenced) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Parameters a caller must supply to select among the implementations
    /// of `algorithm`, including those every registered connector needs.
    ///
    /// Sorted by name. Names only referenced by rules carry
    /// [`DataType::Unknown`] unless some declaration types them.
    pub async fn required_selection_parameters(
        &self,
        algorithm: &AlgorithmId,
    ) -> SelectorResult<Vec<Parameter>> {
        let mut by_name = BTreeMap::new();

        for parameter in self.connectors.sdk_specific_parameters() {
            merge_parameter(&mut by_name, parameter);
        }

        for implementation in self.catalog.implementations_for_algorithm(algorithm).await? {
            for parameter in &implementation.input_parameters {
                merge_parameter(&mut by_name, parameter.clone());
            }
            for name in self.required_parameters(&implementation) {
                merge_parameter(&mut by_name, Parameter::new(name, DataType::Unknown));
            }
        }

        Ok(by_name.into_values().collect())
    }

    /// Evaluate the width and depth rules. Absent rules yield `0`.
    pub fn estimate(
        &self,
        implementation: &Implementation,
        parameters: &RawParameters,
    ) -> SelectorResult<Estimate> {
        let width = match &implementation.width_rule {
            Some(rule) => self.oracle.estimate(rule, parameters)?,
            None => 0,
        };
        let depth = match &implementation.depth_rule {
            Some(rule) => self.oracle.estimate(rule, parameters)?,
            None => 0,
        };
        Ok(Estimate { width, depth })
    }

    async fn analyze_implementation(
        &self,
        implementation: &Implementation,
        parameters: &RawParameters,
    ) -> SelectorResult<Vec<AnalysisResult>> {
        debug!(
            "Searching for suitable QPU for implementation {} (Id: {}) which requires SDK {}",
            implementation.name, implementation.id, implementation.sdk
        );

        let typed = infer_typed(&implementation.input_parameters, parameters)?;
        let estimate = self.estimate(implementation, parameters)?;
        let candidates = self.shortlist(implementation, estimate).await?;
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        match self.connectors.get(&implementation.sdk) {
            Some(connector) => {
                self.refine(connector.as_ref(), implementation, estimate, candidates, &typed)
                    .await
            }
            None => Ok(estimate_fallback(implementation, estimate, candidates)),
        }
    }

    /// QPUs the oracle deems statically compatible, resolved through the
    /// catalog. IDs the catalog no longer knows are dropped.
    async fn shortlist(
        &self,
        implementation: &Implementation,
        estimate: Estimate,
    ) -> SelectorResult<Vec<Qpu>> {
        let ids = self
            .oracle
            .shortlist(&implementation.id, estimate.width, estimate.depth)?;
        if ids.is_empty() {
            debug!(
                "Rule oracle returns no suited QPUs. Skipping implementation {} for the selection",
                implementation.name
            );
            return Ok(vec![]);
        }

        let mut candidates: Vec<Qpu> = Vec::with_capacity(ids.len());
        for id in ids {
            if candidates.iter().any(|q| q.id == id) {
                continue;
            }
            match self.catalog.qpu(&id).await? {
                Some(qpu) => candidates.push(qpu),
                None => debug!("Shortlisted QPU {} is no longer in the catalog", id),
            }
        }
        debug!("Filtering based on estimates returned {} QPU candidate(s)", candidates.len());
        Ok(candidates)
    }

    /// Compile the implementation for each candidate and keep the QPUs the
    /// resulting circuit fits on.
    async fn refine(
        &self,
        connector: &dyn SdkConnector,
        implementation: &Implementation,
        estimate: Estimate,
        candidates: Vec<Qpu>,
        typed: &TypedParameters,
    ) -> SelectorResult<Vec<AnalysisResult>> {
        let mut results = Vec::new();
        for qpu in candidates {
            debug!(
                "Checking if QPU {} is suitable for implementation {}",
                qpu.name, implementation.name
            );

            let info = match connector
                .analyze(&implementation.file_location, &qpu, typed)
                .await
            {
                Ok(info) => info,
                Err(e) => {
                    error!(connector = connector.name(), "Circuit analysis raised an error: {}", e);
                    None
                }
            };

            let Some(info) = info else {
                error!("Circuit analysis by compiler failed. Using estimates...");
                if estimate.is_usable() {
                    results.push(AnalysisResult::estimated(
                        qpu,
                        implementation.clone(),
                        estimate.depth,
                        estimate.width,
                    ));
                }
                continue;
            };

            if !info.transpilation_successful {
                info!(
                    "Transpilation of circuit impossible: {}. Skipping QPU {}",
                    info.error.as_deref().unwrap_or("no reason given"),
                    qpu.name
                );
                continue;
            }

            match qpu.admits(info.circuit_width, info.circuit_depth) {
                CapacityCheck::Fits => {
                    results.push(AnalysisResult::measured(qpu, implementation.clone(), &info));
                }
                CapacityCheck::TooWide {
                    required,
                    available,
                } => debug!(
                    "Required qubit number ({}) is greater than provided number ({}). Skipping QPU {}",
                    required, available, qpu.name
                ),
                CapacityCheck::TooDeep {
                    required,
                    available,
                } => debug!(
                    "Required circuit depth ({}) is greater than maximum circuit depth ({}). Skipping QPU {}",
                    required, available, qpu.name
                ),
            }
        }
        Ok(results)
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("connectors", &self.connectors)
            .finish_non_exhaustive()
    }
}

/// Results for an implementation whose SDK has no connector.
///
/// Without a usable estimate nothing can vouch for any candidate, so the
/// implementation contributes nothing.
fn estimate_fallback(
    implementation: &Implementation,
    estimate: Estimate,
    candidates: Vec<Qpu>,
) -> Vec<AnalysisResult> {
    if !estimate.is_usable() {
        warn!(
            "Unable to find SDK connector for SDK {} and no usable estimate for implementation {}. Skipping it",
            implementation.sdk, implementation.name
        );
        return vec![];
    }

    warn!(
        "Unable to find SDK connector for SDK {}. Adding implementation {} and possibly suited QPUs to the result based on the estimates",
        implementation.sdk, implementation.name
    );
    candidates
        .into_iter()
        .map(|qpu| {
            AnalysisResult::estimated(qpu, implementation.clone(), estimate.depth, estimate.width)
        })
        .collect()
}

fn rule_slots(implementation: &Implementation) -> [(Option<&Rule>, RuleKind); 3] {
    [
        (implementation.selection_rule.as_ref(), RuleKind::Selection),
        (implementation.width_rule.as_ref(), RuleKind::Width),
        (implementation.depth_rule.as_ref(), RuleKind::Depth),
    ]
}

/// Keep the first declaration of a name, unless a later one adds a type.
fn merge_parameter(by_name: &mut BTreeMap<String, Parameter>, parameter: Parameter) {
    match by_name.entry(parameter.name.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(parameter);
        }
        Entry::Occupied(mut slot) => {
            if slot.get().data_type == DataType::Unknown && parameter.data_type != DataType::Unknown {
                slot.insert(parameter);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectorError;
    use crate::implementation::ImplementationId;
    use crate::qpu::QpuId;
    use crate::store::InMemoryCatalog;

    /// Oracle whose rule text is `name:value` for estimates, `ok`/`no`/`err`
    /// for selection, and which reads every `$name` token as a reference.
    struct TokenOracle {
        shortlist: Vec<&'static str>,
    }

    impl RuleOracle for TokenOracle {
        fn is_feasible(&self, rule: &Rule, _parameters: &RawParameters) -> SelectorResult<bool> {
            match rule.as_str().split_whitespace().next() {
                Some("ok") => Ok(true),
                Some("no") => Ok(false),
                _ => Err(SelectorError::RuleEvaluation(rule.to_string())),
            }
        }

        fn estimate(&self, rule: &Rule, _parameters: &RawParameters) -> SelectorResult<u32> {
            rule.as_str()
                .split_whitespace()
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| SelectorError::RuleEvaluation(rule.to_string()))
        }

        fn shortlist(
            &self,
            _implementation: &ImplementationId,
            _estimated_width: u32,
            _estimated_depth: u32,
        ) -> SelectorResult<Vec<QpuId>> {
            Ok(self.shortlist.iter().map(|s| QpuId::from(*s)).collect())
        }

        fn referenced_parameters(&self, rule: &Rule, _kind: RuleKind) -> Vec<String> {
            rule.as_str()
                .split_whitespace()
                .filter_map(|t| t.strip_prefix('$'))
                .map(str::to_string)
                .collect()
        }
    }

    fn selector(implementations: Vec<Implementation>, shortlist: Vec<&'static str>) -> Selector {
        let catalog = InMemoryCatalog::with_entries(
            implementations,
            vec![
                Qpu::new("q1", "ibmq_lima", 6, 120.0, 10.0),
                Qpu::new("q2", "ibmq_quito", 5, 100.0, 10.0),
            ],
        );
        Selector::new(
            Arc::new(catalog),
            Arc::new(TokenOracle { shortlist }),
            Arc::new(ConnectorRegistry::new()),
        )
    }

    fn params(pairs: &[(&str, &str)]) -> RawParameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_required_parameters_union_without_duplicates() {
        let impl_ = Implementation::new("i1", "shor", "Shor", "qiskit", "x")
            .with_parameter(Parameter::integer("N"))
            .with_selection_rule("ok $N $L")
            .with_width_rule("5 $L")
            .with_depth_rule("10 $M");

        let s = selector(vec![], vec![]);
        assert_eq!(s.required_parameters(&impl_), vec!["N", "L", "M"]);
    }

    #[tokio::test]
    async fn test_executable_filters_missing_and_rejected() {
        let impls = vec![
            Implementation::new("a", "shor", "needs-N", "qiskit", "x")
                .with_parameter(Parameter::integer("N")),
            Implementation::new("b", "shor", "rejected", "qiskit", "x").with_selection_rule("no"),
            Implementation::new("c", "shor", "broken-rule", "qiskit", "x")
                .with_selection_rule("???"),
            Implementation::new("d", "shor", "ungated", "qiskit", "x"),
            Implementation::new("e", "shor", "accepted", "qiskit", "x").with_selection_rule("ok"),
        ];
        let s = selector(impls, vec![]);

        let found = s
            .executable_implementations(&AlgorithmId::from("shor"), &params(&[]))
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ungated", "accepted"]);
    }

    #[tokio::test]
    async fn test_no_connector_and_missing_estimate_yields_nothing() {
        let impls = vec![
            Implementation::new("a", "shor", "width-only", "qiskit", "x").with_width_rule("5"),
            Implementation::new("b", "shor", "both", "qiskit", "x")
                .with_width_rule("5")
                .with_depth_rule("10"),
        ];
        let s = selector(impls, vec!["q1", "q2"]);

        let results = s
            .perform_selection(&AlgorithmId::from("shor"), &params(&[]))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.implementation.name == "both" && r.estimate));
    }

    #[tokio::test]
    async fn test_estimate_failure_isolated_to_implementation() {
        let impls = vec![
            Implementation::new("a", "shor", "bad-width", "qiskit", "x")
                .with_width_rule("five")
                .with_depth_rule("10"),
            Implementation::new("b", "shor", "good", "qiskit", "x")
                .with_width_rule("5")
                .with_depth_rule("10"),
        ];
        let s = selector(impls, vec!["q1"]);

        let results = s
            .perform_selection(&AlgorithmId::from("shor"), &params(&[]))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].implementation.name, "good");
    }

    #[tokio::test]
    async fn test_shortlist_drops_dangling_and_duplicate_ids() {
        let impls = vec![
            Implementation::new("a", "shor", "A", "qiskit", "x")
                .with_width_rule("5")
                .with_depth_rule("10"),
        ];
        let s = selector(impls, vec!["q2", "gone", "q1", "q2"]);

        let results = s
            .perform_selection(&AlgorithmId::from("shor"), &params(&[]))
            .await
            .unwrap();
        let qpus: Vec<_> = results.iter().map(|r| r.qpu.id.0.as_str()).collect();
        assert_eq!(qpus, vec!["q2", "q1"]);
    }

    #[tokio::test]
    async fn test_required_selection_parameters_prefers_typed_declaration() {
        let impls = vec![
            Implementation::new("a", "shor", "A", "qiskit", "x").with_selection_rule("ok $N $L"),
            Implementation::new("b", "shor", "B", "qiskit", "x")
                .with_parameter(Parameter::integer("N")),
            Implementation::new("c", "grover", "C", "qiskit", "x")
                .with_parameter(Parameter::string("oracle")),
        ];
        let s = selector(impls, vec![]);

        let required = s
            .required_selection_parameters(&AlgorithmId::from("shor"))
            .await
            .unwrap();
        let summary: Vec<_> = required
            .iter()
            .map(|p| (p.name.as_str(), p.data_type))
            .collect();
        assert_eq!(
            summary,
            vec![("L", DataType::Unknown), ("N", DataType::Integer)]
        );
    }

    #[tokio::test]
    async fn test_mistyped_parameter_drops_implementation_without_connector() {
        let impls = vec![
            Implementation::new("a", "shor", "typed", "qiskit", "x")
                .with_parameter(Parameter::integer("N"))
                .with_width_rule("5")
                .with_depth_rule("10"),
        ];
        let s = selector(impls, vec!["q1"]);

        let bad = s
            .perform_selection(&AlgorithmId::from("shor"), &params(&[("N", "fifteen")]))
            .await
            .unwrap();
        assert!(bad.is_empty());

        let good = s
            .perform_selection(&AlgorithmId::from("shor"), &params(&[("N", "15")]))
            .await
            .unwrap();
        assert_eq!(good.len(), 1);
    }

    #[test]
    fn test_estimate_usable() {
        assert!(Estimate { width: 5, depth: 10 }.is_usable());
        assert!(!Estimate { width: 0, depth: 10 }.is_usable());
        assert!(!Estimate::default().is_usable());
    }
}
