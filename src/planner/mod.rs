//! Query planning: logical plans, rewrite rules, physical lowering

pub mod cost;
pub mod error;
pub mod explain;
pub mod logical;
pub mod optimizer;
pub mod physical;

pub use cost::{Cost, CostEstimator};
pub use error::{PlannerError, PlannerResult};
pub use explain::ExplainOutput;
pub use logical::{LogicalPlan, LogicalPlanBuilder, OutputColumn};
pub use optimizer::{Optimizer, RewriteRule};
pub use physical::{JoinStrategy, PhysicalPlan, PhysicalPlanner};
