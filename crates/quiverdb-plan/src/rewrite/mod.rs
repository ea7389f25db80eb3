//! Rewrite rules and the fixpoint driver.
//!
//! A rule is a pure function pair: a cheap `matches` predicate and an
//! `apply` transformation that either returns the root of a fresh tree
//! or `None` for "no change". Rules never mutate the tree they match
//! on; they build replacement nodes in the same arena and clone the
//! untouched surroundings.
//!
//! The [`RewriteEngine`] applies its rules to every node of the tree,
//! restarting after each firing, until a full pass fires nothing.
//! Exceeding the pass bound is a fatal planning error: a rule that does
//! not converge is a rule-authoring bug, not a data condition.

mod decompose;
mod defer_fetch;

pub use decompose::{decompose_conjunction_left, decompose_conjunction_right};
pub use defer_fetch::{defer_fetch_on_fetch, defer_fetch_on_scan};

use tracing::debug;

use crate::error::{PlanError, PlanResult};
use crate::node::{NodeId, PhysicalPlan};

/// Default bound on rewrite passes before divergence is assumed.
const DEFAULT_MAX_PASSES: usize = 64;

/// A stateless tree-to-tree transformation.
pub struct RewriteRule {
    name: &'static str,
    matches: fn(&PhysicalPlan, NodeId) -> bool,
    apply: fn(&mut PhysicalPlan, NodeId) -> PlanResult<Option<NodeId>>,
}

impl RewriteRule {
    /// Creates a rule from its function pair.
    #[must_use]
    pub const fn new(
        name: &'static str,
        matches: fn(&PhysicalPlan, NodeId) -> bool,
        apply: fn(&mut PhysicalPlan, NodeId) -> PlanResult<Option<NodeId>>,
    ) -> Self {
        Self { name, matches, apply }
    }

    /// The rule's name, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the rule could apply at `node`.
    #[must_use]
    pub fn matches(&self, plan: &PhysicalPlan, node: NodeId) -> bool {
        (self.matches)(plan, node)
    }

    /// Applies the rule at `node`, returning the new tree root when it
    /// fired.
    ///
    /// # Errors
    ///
    /// Propagates structural errors from tree construction.
    pub fn apply(&self, plan: &mut PhysicalPlan, node: NodeId) -> PlanResult<Option<NodeId>> {
        (self.apply)(plan, node)
    }
}

impl std::fmt::Debug for RewriteRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteRule").field("name", &self.name).finish()
    }
}

/// Applies a rule set to fixpoint.
#[derive(Debug)]
pub struct RewriteEngine {
    rules: Vec<RewriteRule>,
    max_passes: usize,
}

impl RewriteEngine {
    /// Creates an engine over the given rules.
    #[must_use]
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules, max_passes: DEFAULT_MAX_PASSES }
    }

    /// Creates the standard rule set: left-precedence conjunction
    /// decomposition and deferred fetching.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            decompose_conjunction_left(),
            defer_fetch_on_scan(),
            defer_fetch_on_fetch(),
        ])
    }

    /// Overrides the pass bound.
    #[must_use]
    pub const fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Rewrites the tree rooted at `root` until no rule fires.
    ///
    /// Returns the root of the final tree (the original root when
    /// nothing fired).
    ///
    /// # Errors
    ///
    /// [`PlanError::RewriteDivergence`] when the pass bound is
    /// exceeded; structural errors from rule application are
    /// propagated.
    pub fn optimize(&self, plan: &mut PhysicalPlan, root: NodeId) -> PlanResult<NodeId> {
        let mut root = root;
        for pass in 0..self.max_passes {
            let mut fired = false;
            'nodes: for node in plan.walk(root) {
                for rule in &self.rules {
                    if !rule.matches(plan, node) {
                        continue;
                    }
                    if let Some(new_root) = rule.apply(plan, node)? {
                        debug!(rule = rule.name(), pass, "rewrite rule fired");
                        root = new_root;
                        fired = true;
                        break 'nodes;
                    }
                }
            }
            if !fired {
                return Ok(root);
            }
        }
        Err(PlanError::RewriteDivergence { passes: self.max_passes })
    }
}
