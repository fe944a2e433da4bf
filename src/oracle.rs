//! Rule oracle interface.
//!
//! The rule oracle is the knowledge base that understands implementation
//! rules and static QPU facts. The selector never interprets rule text
//! itself; it only asks the oracle four questions:
//!
//! | Method | Question |
//! |--------|----------|
//! | `is_feasible()` | does the selection rule accept these parameters? |
//! | `estimate()` | what number does a width or depth rule yield? |
//! | `shortlist()` | which QPUs can statically hold this estimate? |
//! | `referenced_parameters()` | which parameter names does a rule read? |
//!
//! Oracle calls are synchronous; a logic-engine backed oracle answers from an
//! in-process knowledge base.

use crate::error::SelectorResult;
use crate::implementation::{ImplementationId, Rule};
use crate::parameter::RawParameters;
use crate::qpu::QpuId;

/// Which slot of an implementation a rule fills.
///
/// Width and depth rules bind their last argument to the result, so that
/// argument is not an input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Selection,
    Width,
    Depth,
}

impl RuleKind {
    /// Check if the rule yields a number rather than a verdict.
    pub fn is_estimate(&self) -> bool {
        matches!(self, RuleKind::Width | RuleKind::Depth)
    }
}

/// Evaluates implementation rules and static QPU facts.
pub trait RuleOracle: Send + Sync {
    /// Evaluate a selection rule against the supplied parameters.
    fn is_feasible(&self, rule: &Rule, parameters: &RawParameters) -> SelectorResult<bool>;

    /// Evaluate a width or depth rule.
    fn estimate(&self, rule: &Rule, parameters: &RawParameters) -> SelectorResult<u32>;

    /// QPUs whose static facts admit the implementation at the given
    /// estimates. `0` means "no estimate".
    ///
    /// Order is significant: results are emitted in this order. The
    /// selector keeps the first occurrence of a repeated ID, so each QPU
    /// yields at most one result per implementation.
    fn shortlist(
        &self,
        implementation: &ImplementationId,
        estimated_width: u32,
        estimated_depth: u32,
    ) -> SelectorResult<Vec<QpuId>>;

    /// Parameter names a rule reads, found by static analysis.
    fn referenced_parameters(&self, rule: &Rule, kind: RuleKind) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_kind_is_estimate() {
        assert!(!RuleKind::Selection.is_estimate());
        assert!(RuleKind::Width.is_estimate());
        assert!(RuleKind::Depth.is_estimate());
    }
}
