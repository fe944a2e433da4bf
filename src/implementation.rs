//! Algorithm implementations.
//!
//! An [`Implementation`] is a concrete, runnable encoding of an algorithm for
//! one SDK. Besides its declared inputs it may carry three rules that the
//! rule oracle understands:
//!
//! - a **selection rule** gating whether the implementation is usable at all,
//! - a **width rule** estimating the number of qubits,
//! - a **depth rule** estimating the circuit depth.
//!
//! All three are optional. The selector treats the rule text as opaque.

use serde::{Deserialize, Serialize};

use crate::parameter::Parameter;

/// Unique identifier for an algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlgorithmId(pub String);

impl AlgorithmId {
    /// Create a new algorithm ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AlgorithmId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for an implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplementationId(pub String);

impl ImplementationId {
    /// Create a new implementation ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImplementationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Rule text evaluated by the rule oracle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rule(pub String);

impl Rule {
    /// Wrap rule text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The rule source.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A runnable implementation of an algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub id: ImplementationId,
    /// Algorithm this implements.
    pub implemented_algorithm: AlgorithmId,
    pub name: String,
    /// Name of the SDK the implementation is written with, e.g. `"qiskit"`.
    pub sdk: String,
    /// Where the connector fetches the source from.
    pub file_location: String,
    /// Declared inputs, in declaration order.
    #[serde(default)]
    pub input_parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_rule: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_rule: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_rule: Option<Rule>,
}

impl Implementation {
    /// Create an implementation without parameters or rules.
    pub fn new(
        id: impl Into<ImplementationId>,
        algorithm: impl Into<AlgorithmId>,
        name: impl Into<String>,
        sdk: impl Into<String>,
        file_location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            implemented_algorithm: algorithm.into(),
            name: name.into(),
            sdk: sdk.into(),
            file_location: file_location.into(),
            input_parameters: vec![],
            selection_rule: None,
            width_rule: None,
            depth_rule: None,
        }
    }

    /// Declare an input parameter.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.input_parameters.push(parameter);
        self
    }

    pub fn with_selection_rule(mut self, rule: impl Into<String>) -> Self {
        self.selection_rule = Some(Rule::new(rule));
        self
    }

    pub fn with_width_rule(mut self, rule: impl Into<String>) -> Self {
        self.width_rule = Some(Rule::new(rule));
        self
    }

    pub fn with_depth_rule(mut self, rule: impl Into<String>) -> Self {
        self.depth_rule = Some(Rule::new(rule));
        self
    }

    /// Iterate over the rules that are set.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        [&self.selection_rule, &self.width_rule, &self.depth_rule]
            .into_iter()
            .flatten()
    }
}
