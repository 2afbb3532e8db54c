//! 플랜 정규화 옵티마이저: 규칙 기반
//!
//! push-down 드라이버가 플랜을 접기 전에 LogicalPlan을 정규화합니다.
//! 기본 규칙: CollapseLimits. 확장 모듈이 기여한 규칙(내장 모듈의
//! CombineFilters 포함)은 배치 위치(RulePlacement)에 따라 기본 규칙 앞/뒤에
//! 병합됩니다.

mod collapse_limits;
mod combine_filters;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::debug;

use crate::error::PlannerResult;
use crate::extension::LoadedModules;
use crate::sql::planner::LogicalPlan;

pub use collapse_limits::CollapseLimitsRule;
pub use combine_filters::CombineFiltersRule;

/// 최적화 규칙 트레이트
pub trait OptimizationRule: Send + Sync {
    /// 규칙 이름
    fn name(&self) -> &str;

    /// LogicalPlan에 규칙 적용
    fn apply(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan>;
}

/// Where a contributed rule runs relative to the default rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePlacement {
    BeforeDefaults,
    AfterDefaults,
}

/// 쿼리 옵티마이저
pub struct QueryOptimizer {
    rules: Vec<Arc<dyn OptimizationRule>>,
}

impl QueryOptimizer {
    /// 기본 최적화 규칙으로 생성
    pub fn new() -> Self {
        Self {
            rules: Self::default_rules(),
        }
    }

    fn default_rules() -> Vec<Arc<dyn OptimizationRule>> {
        vec![Arc::new(CollapseLimitsRule)]
    }

    /// 기본 규칙 + 모듈이 기여한 규칙
    ///
    /// Contributed rules keep module load order within each placement.
    pub fn with_modules(modules: &LoadedModules) -> Self {
        let mut before = Vec::new();
        let mut after = Vec::new();
        for contribution in modules.optimizer_rules() {
            match contribution.placement {
                RulePlacement::BeforeDefaults => before.push(contribution.rule.clone()),
                RulePlacement::AfterDefaults => after.push(contribution.rule.clone()),
            }
        }

        let mut rules = before;
        rules.extend(Self::default_rules());
        rules.extend(after);
        Self { rules }
    }

    /// 규칙 이름 목록 (실행 순서)
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// 모든 규칙 적용
    pub fn optimize(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan> {
        let mut optimized = plan;
        for rule in &self.rules {
            debug!(target: "pushdown", rule = rule.name(), "applying rule");
            optimized = rule.apply(optimized)?;
        }
        Ok(optimized)
    }
}

impl Default for QueryOptimizer {
    fn default() -> Self {
        Self::new()
    }
}
