//! Quantum processing unit descriptors.
//!
//! A [`Qpu`] describes what an execution target can hold: how many qubits it
//! offers and how many gate layers fit inside its coherence window. The
//! selector uses these numbers as hard capacity gates after a circuit has
//! been compiled for the target.
//!
//! Time values (`t1`, `max_gate_time`) must share a unit; the selector only
//! ever uses their ratio.

use serde::{Deserialize, Serialize};

/// Unique identifier for a QPU.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QpuId(pub String);

impl QpuId {
    /// Create a new QPU ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for QpuId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for QpuId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for QpuId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A quantum processing unit (or simulator) that circuits can run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qpu {
    /// Identifier of the QPU.
    pub id: QpuId,
    /// Name of the QPU.
    pub name: String,
    /// Provider operating the QPU.
    #[serde(default)]
    pub provider: String,
    /// Number of qubits available.
    pub qubit_count: u32,
    /// Average T1 relaxation time.
    pub t1: f64,
    /// Longest duration of a single gate.
    pub max_gate_time: f64,
    /// Names of the SDKs that can target this QPU.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_sdks: Vec<String>,
    /// Whether this is a simulator (not real hardware).
    pub is_simulator: bool,
}

impl Qpu {
    /// Create a hardware QPU descriptor.
    pub fn new(
        id: impl Into<QpuId>,
        name: impl Into<String>,
        qubit_count: u32,
        t1: f64,
        max_gate_time: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider: String::new(),
            qubit_count,
            t1,
            max_gate_time,
            supported_sdks: vec![],
            is_simulator: false,
        }
    }

    /// Create a simulator descriptor.
    ///
    /// Simulators have no decoherence, so the depth budget is effectively
    /// unbounded.
    pub fn simulator(id: impl Into<QpuId>, name: impl Into<String>, qubit_count: u32) -> Self {
        Self {
            is_simulator: true,
            ..Self::new(id, name, qubit_count, f64::from(u32::MAX), 1.0)
        }
    }

    /// Set the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Add a supported SDK.
    pub fn with_sdk(mut self, sdk: impl Into<String>) -> Self {
        self.supported_sdks.push(sdk.into());
        self
    }

    /// Check whether circuits written with `sdk` can target this QPU.
    pub fn supports_sdk(&self, sdk: &str) -> bool {
        self.supported_sdks.iter().any(|s| s == sdk)
    }

    /// Maximum number of sequential gates that fit inside the coherence
    /// window: `floor(t1 / max_gate_time)`.
    ///
    /// Returns 0 when the timing data is unusable (non-positive or
    /// non-finite gate time, negative T1).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_circuit_depth(&self) -> u64 {
        if !self.max_gate_time.is_finite()
            || self.max_gate_time <= 0.0
            || self.t1.is_nan()
            || self.t1 < 0.0
        {
            return 0;
        }
        let depth = (self.t1 / self.max_gate_time).floor();
        if depth >= u64::MAX as f64 {
            u64::MAX
        } else {
            depth as u64
        }
    }

    /// Check whether a compiled circuit fits: width within the qubit count
    /// and depth within [`Self::max_circuit_depth`].
    pub fn admits(&self, width: u32, depth: u32) -> CapacityCheck {
        if width > self.qubit_count {
            return CapacityCheck::TooWide {
                required: width,
                available: self.qubit_count,
            };
        }
        let max_depth = self.max_circuit_depth();
        if u64::from(depth) > max_depth {
            return CapacityCheck::TooDeep {
                required: depth,
                available: max_depth,
            };
        }
        CapacityCheck::Fits
    }
}

/// Outcome of checking a compiled circuit against a QPU's capacity.
///
/// The width gate is checked first; a circuit that is both too wide and too
/// deep reports `TooWide`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityCheck {
    /// Circuit fits on the QPU.
    Fits,
    /// Circuit needs more qubits than the QPU has.
    TooWide { required: u32, available: u32 },
    /// Circuit is deeper than the coherence window allows.
    TooDeep { required: u32, available: u64 },
}

impl CapacityCheck {
    /// Check if the circuit fits.
    pub fn fits(&self) -> bool {
        matches!(self, CapacityCheck::Fits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_circuit_depth() {
        let qpu = Qpu::new("q1", "ibmq_lima", 5, 120.0, 10.0);
        assert_eq!(qpu.max_circuit_depth(), 12);

        let qpu = Qpu::new("q2", "odd", 5, 125.0, 10.0);
        assert_eq!(qpu.max_circuit_depth(), 12);
    }

    #[test]
    fn test_max_circuit_depth_unusable_timing() {
        assert_eq!(Qpu::new("a", "a", 5, 100.0, 0.0).max_circuit_depth(), 0);
        assert_eq!(Qpu::new("b", "b", 5, 100.0, -1.0).max_circuit_depth(), 0);
        assert_eq!(Qpu::new("c", "c", 5, 100.0, f64::NAN).max_circuit_depth(), 0);
        assert_eq!(Qpu::new("d", "d", 5, f64::NAN, 1.0).max_circuit_depth(), 0);
    }

    #[test]
    fn test_admits() {
        let qpu = Qpu::new("q1", "ibmq_lima", 6, 120.0, 10.0);
        assert!(qpu.admits(6, 12).fits());
        assert_eq!(
            qpu.admits(8, 3),
            CapacityCheck::TooWide {
                required: 8,
                available: 6
            }
        );
        assert_eq!(
            qpu.admits(2, 13),
            CapacityCheck::TooDeep {
                required: 13,
                available: 12
            }
        );
        // width is checked first
        assert!(matches!(qpu.admits(9, 99), CapacityCheck::TooWide { .. }));
    }

    #[test]
    fn test_simulator() {
        let sim = Qpu::simulator("sim", "qasm_simulator", 32).with_sdk("qiskit");
        assert!(sim.is_simulator);
        assert!(sim.supports_sdk("qiskit"));
        assert!(!sim.supports_sdk("Qiskit"));
        assert!(sim.admits(32, 1_000_000).fits());
    }
}
