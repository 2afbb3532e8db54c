//! Rule 1: Combine Filters
//!
//! 연속된 Filter를 하나의 AND 조건으로 합치고, Scan 바로 위의 Filter는 Scan에 흡수

use crate::error::PlannerResult;
use crate::sql::planner::LogicalPlan;

use super::OptimizationRule;

/// 연속된 Filter를 하나로 합쳐 드라이버가 한 번에 접을 수 있게 함
pub struct CombineFiltersRule;

impl OptimizationRule for CombineFiltersRule {
    fn name(&self) -> &str {
        "CombineFilters"
    }

    fn apply(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan> {
        self.combine(plan)
    }
}

impl CombineFiltersRule {
    fn combine(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan> {
        match plan {
            LogicalPlan::Filter { input, predicate } => {
                let optimized_input = self.combine(*input)?;
                match optimized_input {
                    LogicalPlan::Filter {
                        input: inner_input,
                        predicate: inner,
                    } => Ok(LogicalPlan::Filter {
                        input: inner_input,
                        predicate: inner.and(predicate),
                    }),
                    LogicalPlan::Scan {
                        table,
                        columns,
                        filter,
                    } => Ok(LogicalPlan::Scan {
                        table,
                        columns,
                        filter: Some(match filter {
                            Some(existing) => existing.and(predicate),
                            None => predicate,
                        }),
                    }),
                    other => Ok(LogicalPlan::Filter {
                        input: Box::new(other),
                        predicate,
                    }),
                }
            }
            other => other.map_children(|child| self.combine(child)),
        }
    }
}

