//! Built-in module, always loaded first

use std::sync::Arc;

use super::{FunctionRegistry, PlannerModule, PlanningStrategy, RuleContribution};
use crate::pushdown::PushdownStrategy;
use crate::sql::optimizer::{CombineFiltersRule, RulePlacement};
use crate::sql::planner::ScalarFunction;

pub const BUILTIN_MODULE_NAME: &str = "builtin";

/// Functions and rules every planner has
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinModule;

impl PlannerModule for BuiltinModule {
    fn name(&self) -> &str {
        BUILTIN_MODULE_NAME
    }

    fn register_functions(&self, registry: &mut FunctionRegistry) {
        registry.register("date_trunc", ScalarFunction::DateTrunc);
        registry.register("upper", ScalarFunction::Upper);
        registry.register("lower", ScalarFunction::Lower);
        registry.register("substring", ScalarFunction::Substring);
    }

    fn optimizer_rules(&self) -> Vec<RuleContribution> {
        vec![RuleContribution::new(
            RulePlacement::BeforeDefaults,
            Arc::new(CombineFiltersRule),
        )]
    }

    fn planning_strategies(&self) -> Vec<Arc<dyn PlanningStrategy>> {
        vec![Arc::new(PushdownStrategy)]
    }
}
