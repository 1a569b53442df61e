//! Parameters and results of differentiation.

use std::collections::BTreeSet;

use kiln_common::UnitRef;

use crate::delta::Delta;

/// Restricts which units may be reported as affected.
#[derive(Debug, Clone, Default)]
pub struct UnitFilter {
    excluded_prefixes: Vec<String>,
}

impl UnitFilter {
    /// A filter that accepts every unit.
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// A filter rejecting units under any of `prefixes`, e.g. library-only paths.
    pub fn excluding(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded_prefixes: prefixes.into_iter().collect(),
        }
    }

    /// Returns `true` if `unit` may count as affected.
    pub fn accepts(&self, unit: &UnitRef) -> bool {
        !self.excluded_prefixes.iter().any(|p| unit.is_under(p))
    }
}

/// Configures one differentiation.
#[derive(Debug, Clone)]
pub struct DifferentiateParams {
    /// Whether affected units should be computed at all.
    pub calculate_affected: bool,
    /// Whether the compilation that produced the delta reported errors.
    pub compiled_with_errors: bool,
    /// Which units may be reported as affected.
    pub affection_filter: UnitFilter,
}

impl DifferentiateParams {
    /// Parameters computing affected units for an error-free compilation.
    pub fn new(affection_filter: UnitFilter) -> Self {
        Self {
            calculate_affected: true,
            compiled_with_errors: false,
            affection_filter,
        }
    }

    /// Sets whether affected units are computed.
    pub fn with_calculate_affected(mut self, calculate: bool) -> Self {
        self.calculate_affected = calculate;
        self
    }

    /// Records whether the compilation reported errors.
    pub fn with_errors(mut self, errors: bool) -> Self {
        self.compiled_with_errors = errors;
        self
    }
}

/// Outcome of differentiating a delta.
#[derive(Debug, Clone)]
pub struct DifferentiateResult {
    delta: Delta,
    incremental: bool,
    affected: BTreeSet<UnitRef>,
}

impl DifferentiateResult {
    /// Creates a result for `delta`.
    pub fn new(delta: Delta, incremental: bool, affected: BTreeSet<UnitRef>) -> Self {
        Self {
            delta,
            incremental,
            affected,
        }
    }

    /// A bounded result with nothing affected.
    pub fn unaffected(delta: Delta) -> Self {
        Self::new(delta, true, BTreeSet::new())
    }

    /// `false` when the change is too disruptive to reason about per unit.
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Units that must be recompiled because of the delta.
    pub fn affected(&self) -> &BTreeSet<UnitRef> {
        &self.affected
    }

    /// The differentiated delta.
    pub fn delta(&self) -> &Delta {
        &self.delta
    }

    /// Splits the result back into its delta.
    pub fn into_delta(self) -> Delta {
        self.delta
    }
}
