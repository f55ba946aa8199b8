//! Physical plan to executor tree translation

use crate::catalog::Catalog;
use crate::planner::PhysicalPlan;
use crate::source::source_for;

use super::aggregate::HashAggregateExec;
use super::delete::DeleteScanExec;
use super::error::{ExecutorError, ExecutorResult};
use super::filter::FilterExec;
use super::join::{HashJoinExec, NestedLoopJoinExec};
use super::project::{CalcExec, ProjectExec};
use super::scan::ScanExec;
use super::sort::SortExec;
use super::values::ValuesExec;
use super::Executor;

/// Builds an executor tree for a physical plan against a catalog
pub struct ExecutorEngine<'a> {
    catalog: &'a Catalog,
}

impl<'a> ExecutorEngine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        ExecutorEngine { catalog }
    }

    pub fn build(&self, plan: &PhysicalPlan) -> ExecutorResult<Box<dyn Executor>> {
        match plan {
            PhysicalPlan::TableScan { table, .. } => {
                let schema = self.lookup(table)?;
                Ok(Box::new(ScanExec::new(source_for(schema))))
            }

            PhysicalPlan::Filter { input, predicate } => Ok(Box::new(FilterExec::new(
                self.build(input)?,
                predicate.clone(),
            ))),

            PhysicalPlan::Project { input, expressions } => {
                let exprs = expressions.iter().map(|(e, _)| e.clone()).collect();
                Ok(Box::new(ProjectExec::new(self.build(input)?, exprs)))
            }

            PhysicalPlan::Calc {
                input,
                expressions,
                predicate,
            } => {
                let exprs = expressions.iter().map(|(e, _)| e.clone()).collect();
                Ok(Box::new(CalcExec::new(
                    self.build(input)?,
                    exprs,
                    predicate.clone(),
                )))
            }

            PhysicalPlan::NestedLoopJoin {
                left,
                right,
                join_type,
                condition,
            } => {
                let left_width = left.output_columns().len();
                let right_width = right.output_columns().len();
                Ok(Box::new(NestedLoopJoinExec::new(
                    self.build(left)?,
                    self.build(right)?,
                    *join_type,
                    condition.clone(),
                    left_width,
                    right_width,
                )))
            }

            PhysicalPlan::HashJoin {
                left,
                right,
                left_key,
                right_key,
            } => Ok(Box::new(HashJoinExec::new(
                self.build(left)?,
                self.build(right)?,
                *left_key,
                *right_key,
            ))),

            PhysicalPlan::HashAggregate {
                input,
                group_by,
                aggregates,
            } => {
                let calls = aggregates.iter().map(|(call, _)| call.clone()).collect();
                Ok(Box::new(HashAggregateExec::new(
                    self.build(input)?,
                    group_by.clone(),
                    calls,
                )))
            }

            PhysicalPlan::Sort { input, keys } => {
                Ok(Box::new(SortExec::new(self.build(input)?, keys.clone())))
            }

            PhysicalPlan::Values {
                columns, values, ..
            } => Ok(Box::new(ValuesExec::new(columns.clone(), values.clone()))),

            PhysicalPlan::DeleteScan {
                table, predicate, ..
            } => {
                let schema = self.lookup(table)?;
                Ok(Box::new(DeleteScanExec::new(
                    source_for(schema),
                    predicate.clone(),
                )))
            }
        }
    }

    fn lookup(&self, table: &str) -> ExecutorResult<&'a crate::catalog::TableSchema> {
        self.catalog
            .get_table(table)
            .ok_or_else(|| ExecutorError::Source(format!("table '{}' not registered", table)))
    }
}
