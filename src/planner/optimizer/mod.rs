//! Rule-based optimizer
//!
//! Runs an ordered list of rewrite rules over the logical plan until it
//! reaches a fixed point, bounded by a pass budget. Every rule application
//! is checked to be schema-preserving; a violation is a bug in the rule
//! and surfaces as `PlannerError::SchemaMismatch`.

pub mod rules;

pub use rules::{
    FilterMerge, FuseFilterProject, PushFilterIntoJoin, PushFilterPastProject, RewriteRule,
};

use tracing::{debug, trace, warn};

use super::error::{PlannerError, PlannerResult};
use super::logical::LogicalPlan;

/// Maximum rewrite passes before giving up on a fixed point
pub const DEFAULT_PASS_BUDGET: usize = 8;

/// The rule-based optimizer
pub struct Optimizer {
    rules: Vec<Box<dyn RewriteRule>>,
    pass_budget: usize,
}

impl Optimizer {
    /// Optimizer with the default rule set, in priority order
    pub fn new() -> Self {
        Self::with_rules(Self::default_rules())
    }

    /// The default ordered rule set. Pushdown runs before fusion so fused
    /// Calc nodes never block a pushdown.
    pub fn default_rules() -> Vec<Box<dyn RewriteRule>> {
        vec![
            Box::new(FilterMerge),
            Box::new(PushFilterPastProject),
            Box::new(PushFilterIntoJoin),
            Box::new(FuseFilterProject),
        ]
    }

    /// Optimizer with a caller-supplied ordered rule list
    pub fn with_rules(rules: Vec<Box<dyn RewriteRule>>) -> Self {
        Optimizer {
            rules,
            pass_budget: DEFAULT_PASS_BUDGET,
        }
    }

    pub fn pass_budget(mut self, passes: usize) -> Self {
        self.pass_budget = passes.max(1);
        self
    }

    /// Active rule names, in application order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Rewrite the plan to a fixed point (or until the pass budget runs
    /// out, which keeps the current plan and only warns).
    pub fn optimize(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan> {
        let schema = plan.output_columns();
        let mut current = plan;

        for pass in 0..self.pass_budget {
            let mut next = current.clone();
            for rule in &self.rules {
                next = rule.apply(next);
                if next.output_columns() != schema {
                    return Err(PlannerError::SchemaMismatch {
                        rule: rule.name().to_string(),
                    });
                }
                trace!(rule = rule.name(), pass, "applied rewrite rule");
            }

            if next == current {
                debug!(passes = pass + 1, "optimizer reached fixed point");
                return Ok(next);
            }
            current = next;
        }

        warn!(
            budget = self.pass_budget,
            "optimizer pass budget exhausted before fixed point"
        );
        Ok(current)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}
