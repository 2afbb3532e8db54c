use super::*;
use crate::sql::planner::{BinaryOperator, Expr, LogicalPlan, ScalarValue};

fn scan(table: &str) -> LogicalPlan {
    LogicalPlan::Scan {
        table: table.to_string(),
        columns: vec![],
        filter: None,
    }
}

fn gt(column: &str, value: i64) -> Expr {
    Expr::binary(
        Expr::col(column),
        BinaryOperator::Gt,
        Expr::Literal(ScalarValue::Int64(value)),
    )
}

fn limit(input: LogicalPlan, count: usize, offset: usize) -> LogicalPlan {
    LogicalPlan::Limit {
        input: Box::new(input),
        count,
        offset,
    }
}

// ── Optimizer framework ──

#[test]
fn test_optimizer_default_rules() {
    let optimizer = QueryOptimizer::new();
    assert_eq!(optimizer.rule_names(), vec!["CollapseLimits"]);
}

#[test]
fn test_optimizer_passthrough() {
    let optimizer = QueryOptimizer::new();
    let plan = scan("wikipedia");
    let optimized = optimizer.optimize(plan.clone()).unwrap();
    assert_eq!(optimized, plan);
}

// ── Combine Filters ──

#[test]
fn test_combine_filters_rule_name() {
    assert_eq!(CombineFiltersRule.name(), "CombineFilters");
}

#[test]
fn test_filter_absorbed_into_scan() {
    let plan = LogicalPlan::Filter {
        input: Box::new(scan("wikipedia")),
        predicate: gt("added", 10),
    };
    match CombineFiltersRule.apply(plan).unwrap() {
        LogicalPlan::Scan {
            filter: Some(predicate),
            ..
        } => assert_eq!(predicate, gt("added", 10)),
        other => panic!("Expected Scan with filter, got: {:?}", other),
    }
}

#[test]
fn test_stacked_filters_merge_with_and() {
    let plan = LogicalPlan::Filter {
        input: Box::new(LogicalPlan::Filter {
            input: Box::new(LogicalPlan::Project {
                input: Box::new(scan("wikipedia")),
                projections: vec![(Expr::col("added"), None)],
            }),
            predicate: gt("added", 1),
        }),
        predicate: gt("added", 2),
    };
    match CombineFiltersRule.apply(plan).unwrap() {
        LogicalPlan::Filter {
            predicate:
                Expr::BinaryOp {
                    op: BinaryOperator::And,
                    ..
                },
            input,
        } => assert!(matches!(*input, LogicalPlan::Project { .. })),
        other => panic!("Expected combined AND filter, got: {:?}", other),
    }
}

#[test]
fn test_filter_above_aggregate_not_moved() {
    let plan = LogicalPlan::Filter {
        input: Box::new(LogicalPlan::Aggregate {
            input: Box::new(scan("wikipedia")),
            group_by: vec![Expr::col("page")],
            aggregates: vec![],
        }),
        predicate: gt("total", 5),
    };
    let optimized = CombineFiltersRule.apply(plan.clone()).unwrap();
    assert_eq!(optimized, plan);
}

// ── Collapse Limits ──

#[test]
fn test_collapse_limits_takes_tighter_count() {
    let plan = limit(limit(scan("wikipedia"), 10, 0), 5, 0);
    match CollapseLimitsRule.apply(plan).unwrap() {
        LogicalPlan::Limit {
            count: 5,
            offset: 0,
            input,
        } => assert!(matches!(*input, LogicalPlan::Scan { .. })),
        other => panic!("Expected single Limit 5, got: {:?}", other),
    }
}

#[test]
fn test_collapse_limits_outer_offset_shrinks_window() {
    // rows 0..10, then skip 8 and take 5 => rows 8..10
    let plan = limit(limit(scan("wikipedia"), 10, 0), 5, 8);
    match CollapseLimitsRule.apply(plan).unwrap() {
        LogicalPlan::Limit { count, offset, .. } => {
            assert_eq!(count, 2);
            assert_eq!(offset, 8);
        }
        other => panic!("Expected single Limit, got: {:?}", other),
    }
}

#[test]
fn test_collapse_limits_below_sort() {
    let plan = LogicalPlan::Sort {
        input: Box::new(limit(limit(scan("wikipedia"), 3, 0), 7, 0)),
        order_by: vec![],
    };
    match CollapseLimitsRule.apply(plan).unwrap() {
        LogicalPlan::Sort { input, .. } => {
            assert!(matches!(*input, LogicalPlan::Limit { count: 3, .. }))
        }
        other => panic!("Expected Sort over Limit, got: {:?}", other),
    }
}
