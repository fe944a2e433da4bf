//! Input parameters and their typed runtime values.
//!
//! Callers supply parameters as raw strings. Before a connector sees them,
//! each value is checked against the type its implementation declares:
//!
//! ```text
//!   {"N": "15", "token": "abc"}  ──infer_typed()──→  {"N": Integer(15), "token": String("abc")}
//! ```
//!
//! Names the implementation does not declare are passed through as strings,
//! so SDK-specific values (tokens, shot counts) reach the connector.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{SelectorError, SelectorResult};

/// Raw parameters as supplied by a caller.
pub type RawParameters = FxHashMap<String, String>;

/// Parameters after type inference.
pub type TypedParameters = FxHashMap<String, ParameterValue>;

/// Semantic type of an input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Integer,
    Float,
    Boolean,
    String,
    /// Accept any raw value without checking it.
    Unknown,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "Integer"),
            DataType::Float => write!(f, "Float"),
            DataType::Boolean => write!(f, "Boolean"),
            DataType::String => write!(f, "String"),
            DataType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A declared input parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Name the caller must supply.
    pub name: String,
    /// Expected type of the value.
    pub data_type: DataType,
    /// Free-form restriction, e.g. `"> 2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction: Option<String>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Parameter {
    /// Create a parameter declaration.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            restriction: None,
            description: String::new(),
        }
    }

    /// Shorthand for an integer parameter.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Integer)
    }

    /// Shorthand for a string parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, DataType::String)
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach a restriction.
    pub fn with_restriction(mut self, restriction: impl Into<String>) -> Self {
        self.restriction = Some(restriction.into());
        self
    }
}

/// A runtime value together with the type it was checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    /// Type the raw value conforms to.
    pub data_type: DataType,
    /// Value as supplied by the caller.
    pub raw: String,
}

impl ParameterValue {
    /// Check `raw` against `data_type`.
    pub fn parse(name: &str, data_type: DataType, raw: &str) -> SelectorResult<Self> {
        let invalid = |reason: String| SelectorError::InvalidParameter {
            name: name.to_string(),
            value: raw.to_string(),
            reason,
        };
        let trimmed = raw.trim();
        match data_type {
            DataType::Integer => {
                trimmed
                    .parse::<i64>()
                    .map_err(|e| invalid(e.to_string()))?;
            }
            DataType::Float => {
                trimmed
                    .parse::<f64>()
                    .map_err(|e| invalid(e.to_string()))?;
            }
            DataType::Boolean => {
                parse_bool(trimmed).ok_or_else(|| invalid("expected true or false".into()))?;
            }
            DataType::String | DataType::Unknown => {}
        }
        Ok(Self {
            data_type,
            raw: raw.to_string(),
        })
    }

    /// Create an untyped string value.
    pub fn string(raw: impl Into<String>) -> Self {
        Self {
            data_type: DataType::String,
            raw: raw.into(),
        }
    }

    /// Integer view of the value.
    pub fn as_integer(&self) -> Option<i64> {
        match self.data_type {
            DataType::Integer => self.raw.trim().parse().ok(),
            _ => None,
        }
    }

    /// Float view of the value. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self.data_type {
            DataType::Integer | DataType::Float => self.raw.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self.data_type {
            DataType::Boolean => parse_bool(self.raw.trim()),
            _ => None,
        }
    }

    /// Raw string form.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Type every supplied value using the declared parameters.
///
/// Supplied names without a declaration become strings. Declared names that
/// were not supplied are simply absent; callers check completeness first.
pub fn infer_typed(declared: &[Parameter], supplied: &RawParameters) -> SelectorResult<TypedParameters> {
    let types: FxHashMap<&str, DataType> = declared
        .iter()
        .map(|p| (p.name.as_str(), p.data_type))
        .collect();

    supplied
        .iter()
        .map(|(name, raw)| {
            let value = match types.get(name.as_str()) {
                Some(&data_type) => ParameterValue::parse(name, data_type, raw)?,
                None => ParameterValue::string(raw.clone()),
            };
            Ok((name.clone(), value))
        })
        .collect()
}

/// Drop type information again, e.g. to snapshot the inputs of an execution.
pub fn to_untyped(typed: &TypedParameters) -> RawParameters {
    typed
        .iter()
        .map(|(name, value)| (name.clone(), value.raw.clone()))
        .collect()
}
