// SQL 모듈 진입점
pub mod optimizer;
pub mod planner;

pub use optimizer::{
    CollapseLimitsRule, CombineFiltersRule, OptimizationRule, QueryOptimizer, RulePlacement,
};
pub use planner::{
    AggregateExpr, AggregateFunction, BinaryOperator, DataType, Expr, JoinType, LogicalPlan,
    ScalarFunction, ScalarValue, SortExpr,
};
