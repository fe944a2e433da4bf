//! Analysis result types.
//!
//! [`CircuitInformation`] is what a connector reports after compiling an
//! implementation for one QPU. [`AnalysisResult`] is what the selector hands
//! back to callers: one entry per (implementation, QPU) pair that can run.

use serde::{Deserialize, Serialize};

use crate::implementation::Implementation;
use crate::qpu::Qpu;

/// Properties of a circuit after transpilation for a specific QPU.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitInformation {
    /// Whether transpilation succeeded.
    pub transpilation_successful: bool,
    /// Why transpilation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of qubits the transpiled circuit uses.
    pub circuit_width: u32,
    /// Depth of the transpiled circuit.
    pub circuit_depth: u32,
    /// The transpiled circuit, if the connector exports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpiled_circuit: Option<String>,
    /// Language of `transpiled_circuit`, e.g. `"OpenQASM"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpiled_language: Option<String>,
}

impl CircuitInformation {
    /// Create information for a successful transpilation.
    pub fn transpiled(circuit_width: u32, circuit_depth: u32) -> Self {
        Self {
            transpilation_successful: true,
            circuit_width,
            circuit_depth,
            ..Self::default()
        }
    }

    /// Create information for a failed transpilation.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            transpilation_successful: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Attach the transpiled circuit text.
    pub fn with_circuit(mut self, circuit: impl Into<String>, language: impl Into<String>) -> Self {
        self.transpiled_circuit = Some(circuit.into());
        self.transpiled_language = Some(language.into());
        self
    }
}

/// A QPU able to run an implementation, with the resources it would use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub qpu: Qpu,
    pub implementation: Implementation,
    /// `true` if depth and width come from rules, `false` if measured by
    /// compiling the implementation.
    pub estimate: bool,
    pub analysed_depth: u32,
    pub analysed_width: u32,
    /// Circuit the connector produced for this QPU, if it exported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpiled_circuit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpiled_language: Option<String>,
}

impl AnalysisResult {
    /// Result backed by rule estimates.
    pub fn estimated(qpu: Qpu, implementation: Implementation, depth: u32, width: u32) -> Self {
        Self {
            qpu,
            implementation,
            estimate: true,
            analysed_depth: depth,
            analysed_width: width,
            transpiled_circuit: None,
            transpiled_language: None,
        }
    }

    /// Result backed by a compiled circuit.
    pub fn measured(qpu: Qpu, implementation: Implementation, info: &CircuitInformation) -> Self {
        Self {
            qpu,
            implementation,
            estimate: false,
            analysed_depth: info.circuit_depth,
            analysed_width: info.circuit_width,
            transpiled_circuit: info.transpiled_circuit.clone(),
            transpiled_language: info.transpiled_language.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_information_constructors() {
        let ok = CircuitInformation::transpiled(4, 37).with_circuit("OPENQASM 2.0;", "OpenQASM");
        assert!(ok.transpilation_successful);
        assert_eq!(ok.circuit_width, 4);
        assert_eq!(ok.transpiled_language.as_deref(), Some("OpenQASM"));

        let bad = CircuitInformation::failed("too many qubits");
        assert!(!bad.transpilation_successful);
        assert_eq!(bad.error.as_deref(), Some("too many qubits"));
    }

    #[test]
    fn test_measured_result_takes_circuit_numbers() {
        let qpu = Qpu::new("q1", "ibmq_lima", 5, 120.0, 10.0);
        let impl_ = Implementation::new("i1", "shor", "Shor-15", "qiskit", "https://x/shor.py");
        let r = AnalysisResult::measured(qpu, impl_, &CircuitInformation::transpiled(3, 9));
        assert!(!r.estimate);
        assert_eq!((r.analysed_width, r.analysed_depth), (3, 9));
        assert_eq!(r.transpiled_circuit, None);
    }

    #[test]
    fn test_measured_result_keeps_transpiled_circuit() {
        let qpu = Qpu::new("q1", "ibmq_lima", 5, 120.0, 10.0);
        let impl_ = Implementation::new("i1", "shor", "Shor-15", "qiskit", "https://x/shor.py");
        let info = CircuitInformation::transpiled(3, 9).with_circuit("OPENQASM 2.0;", "OpenQASM");

        let r = AnalysisResult::measured(qpu.clone(), impl_.clone(), &info);
        assert_eq!(r.transpiled_circuit.as_deref(), Some("OPENQASM 2.0;"));
        assert_eq!(r.transpiled_language.as_deref(), Some("OpenQASM"));

        let est = AnalysisResult::estimated(qpu, impl_, 9, 3);
        assert!(est.transpiled_circuit.is_none() && est.transpiled_language.is_none());
    }
}
