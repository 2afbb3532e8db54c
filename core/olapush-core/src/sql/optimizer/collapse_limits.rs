//! Rule 2: Collapse Limits
//!
//! 중첩된 LIMIT를 하나로 합침. 엔진 쿼리는 LIMIT를 한 번만 가질 수 있으므로
//! 드라이버가 접기 전에 정규화해야 함

use crate::error::PlannerResult;
use crate::sql::planner::LogicalPlan;

use super::OptimizationRule;

/// 중첩된 LIMIT를 하나로 합침
pub struct CollapseLimitsRule;

impl OptimizationRule for CollapseLimitsRule {
    fn name(&self) -> &str {
        "CollapseLimits"
    }

    fn apply(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan> {
        self.collapse(plan)
    }
}

impl CollapseLimitsRule {
    fn collapse(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan> {
        match plan {
            LogicalPlan::Limit {
                input,
                count,
                offset,
            } => {
                let optimized_input = self.collapse(*input)?;
                match optimized_input {
                    LogicalPlan::Limit {
                        input: inner_input,
                        count: inner_count,
                        offset: inner_offset,
                    } => {
                        // outer window is applied to the rows the inner one kept
                        let remaining = inner_count.saturating_sub(offset);
                        Ok(LogicalPlan::Limit {
                            input: inner_input,
                            count: count.min(remaining),
                            offset: inner_offset + offset,
                        })
                    }
                    other => Ok(LogicalPlan::Limit {
                        input: Box::new(other),
                        count,
                        offset,
                    }),
                }
            }
            other => other.map_children(|child| self.collapse(child)),
        }
    }
}
