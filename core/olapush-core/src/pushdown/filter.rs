//! Predicate translation: time bounds, row filters, having clauses

use chrono::{DateTime, Utc};

use crate::builder::QueryBuilder;
use crate::interval::{IntervalCondition, IntervalConditionKind};
use crate::query::{BoundOrdering, FilterSpec, HavingSpec};
use crate::sql::planner::{BinaryOperator, Expr, ScalarValue};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// `column op literal`, flipped when the literal is on the left.
fn column_comparison(expr: &Expr) -> Option<(&str, BinaryOperator, &ScalarValue)> {
    let Expr::BinaryOp { left, op, right } = expr else {
        return None;
    };
    if !op.is_comparison() {
        return None;
    }
    match (left.as_ref(), right.as_ref()) {
        (Expr::Column(name), Expr::Literal(value)) => Some((name, *op, value)),
        (Expr::Literal(value), Expr::Column(name)) => Some((name, op.flip(), value)),
        _ => None,
    }
}

fn instant(value: &ScalarValue) -> Option<DateTime<Utc>> {
    match value {
        ScalarValue::Timestamp(ms) => DateTime::from_timestamp_millis(*ms),
        ScalarValue::Date(days) => {
            DateTime::from_timestamp_millis(i64::from(*days).checked_mul(MILLIS_PER_DAY)?)
        }
        _ => None,
    }
}

/// Time-range conditions for a comparison of the time column against a
/// timestamp literal. Equality yields both bounds.
pub(crate) fn interval_conditions(
    builder: &QueryBuilder,
    expr: &Expr,
) -> Option<Vec<IntervalCondition>> {
    let (name, op, value) = column_comparison(expr)?;
    if !builder.engine_column(name)?.is_time() {
        return None;
    }
    let at = instant(value)?;
    let kinds = match op {
        BinaryOperator::Lt => vec![IntervalConditionKind::Lt],
        BinaryOperator::LtEq => vec![IntervalConditionKind::LtEq],
        BinaryOperator::Gt => vec![IntervalConditionKind::Gt],
        BinaryOperator::GtEq => vec![IntervalConditionKind::GtEq],
        BinaryOperator::Eq => vec![IntervalConditionKind::GtEq, IntervalConditionKind::LtEq],
        _ => return None,
    };
    Some(
        kinds
            .into_iter()
            .map(|kind| IntervalCondition::new(kind, at))
            .collect(),
    )
}

/// Resolves `name` to a non-time dimension and returns its engine name.
fn dimension(builder: &QueryBuilder, name: &str) -> Option<(QueryBuilder, String)> {
    if !builder.is_non_time_dimension(name) {
        return None;
    }
    let (next, column) = builder.resolve_column(name)?;
    Some((next, column.name))
}

/// Row filter equivalent to `expr`, recording the columns it reads.
///
/// `None` when any part of `expr` has no filter equivalent.
pub(crate) fn to_filter_spec(builder: &QueryBuilder, expr: &Expr) -> Option<(QueryBuilder, FilterSpec)> {
    if let Some((name, op, value)) = column_comparison(expr) {
        let (next, dim) = dimension(builder, name)?;
        let rendered = value.to_filter_string()?;
        let ordering = if value.is_numeric() {
            BoundOrdering::Numeric
        } else {
            BoundOrdering::Lexicographic
        };
        let bound = |lower: Option<String>, upper: Option<String>, strict: bool| FilterSpec::Bound {
            dimension: dim.clone(),
            lower_strict: strict && lower.is_some(),
            upper_strict: strict && upper.is_some(),
            lower,
            upper,
            ordering,
        };
        let spec = match op {
            BinaryOperator::Eq => FilterSpec::selector(dim.clone(), Some(rendered)),
            BinaryOperator::NotEq => FilterSpec::not(FilterSpec::selector(dim.clone(), Some(rendered))),
            BinaryOperator::Lt => bound(None, Some(rendered), true),
            BinaryOperator::LtEq => bound(None, Some(rendered), false),
            BinaryOperator::Gt => bound(Some(rendered), None, true),
            BinaryOperator::GtEq => bound(Some(rendered), None, false),
            _ => return None,
        };
        return Some((next, spec));
    }

    match expr {
        Expr::BinaryOp {
            left,
            op: op @ (BinaryOperator::And | BinaryOperator::Or),
            right,
        } => {
            let (next, l) = to_filter_spec(builder, left)?;
            let (next, r) = to_filter_spec(&next, right)?;
            let spec = if *op == BinaryOperator::And {
                FilterSpec::and(l, r)
            } else {
                FilterSpec::or(l, r)
            };
            Some((next, spec))
        }
        Expr::Not(inner) => {
            let (next, spec) = to_filter_spec(builder, inner)?;
            Some((next, FilterSpec::not(spec)))
        }
        Expr::IsNull(inner) => {
            let Expr::Column(name) = inner.as_ref() else {
                return None;
            };
            let (next, dim) = dimension(builder, name)?;
            Some((next, FilterSpec::selector(dim, None)))
        }
        Expr::IsNotNull(inner) => {
            let Expr::Column(name) = inner.as_ref() else {
                return None;
            };
            let (next, dim) = dimension(builder, name)?;
            Some((next, FilterSpec::not(FilterSpec::selector(dim, None))))
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let Expr::Column(name) = expr.as_ref() else {
                return None;
            };
            let values = list
                .iter()
                .map(|item| match item {
                    Expr::Literal(value) => value.to_filter_string(),
                    _ => None,
                })
                .collect::<Option<Vec<String>>>()?;
            let (next, dim) = dimension(builder, name)?;
            let spec = FilterSpec::In {
                dimension: dim,
                values,
            };
            Some((next, if *negated { FilterSpec::not(spec) } else { spec }))
        }
        _ => None,
    }
}

/// Aggregate output an expression above the aggregate refers to.
pub(crate) fn aggregate_output(builder: &QueryBuilder, expr: &Expr) -> Option<String> {
    let name = match expr {
        Expr::Column(name) => builder.alias_target(name).to_string(),
        Expr::Aggregate(agg) => agg.output_name(),
        _ => return None,
    };
    builder
        .aggregations()
        .iter()
        .any(|a| a.name() == name)
        .then_some(name)
}

/// Having clause equivalent to `expr` over aggregator outputs.
pub(crate) fn to_having_spec(builder: &QueryBuilder, expr: &Expr) -> Option<HavingSpec> {
    match expr {
        Expr::BinaryOp {
            left,
            op: op @ (BinaryOperator::And | BinaryOperator::Or),
            right,
        } => {
            let l = to_having_spec(builder, left)?;
            let r = to_having_spec(builder, right)?;
            Some(if *op == BinaryOperator::And {
                HavingSpec::and(l, r)
            } else {
                HavingSpec::Or {
                    having_specs: vec![l, r],
                }
            })
        }
        Expr::Not(inner) => to_having_spec(builder, inner).map(HavingSpec::not),
        Expr::BinaryOp { left, op, right } if op.is_comparison() => {
            let (reference, op, value) = match (left.as_ref(), right.as_ref()) {
                (reference, Expr::Literal(value)) => (reference, *op, value),
                (Expr::Literal(value), reference) => (reference, op.flip(), value),
                _ => return None,
            };
            let aggregation = aggregate_output(builder, reference)?;
            let value = value.as_f64()?;
            let greater = || HavingSpec::GreaterThan {
                aggregation: aggregation.clone(),
                value,
            };
            let less = || HavingSpec::LessThan {
                aggregation: aggregation.clone(),
                value,
            };
            let equal = || HavingSpec::EqualTo {
                aggregation: aggregation.clone(),
                value,
            };
            match op {
                BinaryOperator::Gt => Some(greater()),
                BinaryOperator::Lt => Some(less()),
                BinaryOperator::Eq => Some(equal()),
                BinaryOperator::GtEq => Some(HavingSpec::not(less())),
                BinaryOperator::LtEq => Some(HavingSpec::not(greater())),
                BinaryOperator::NotEq => Some(HavingSpec::not(equal())),
                _ => None,
            }
        }
        _ => None,
    }
}
