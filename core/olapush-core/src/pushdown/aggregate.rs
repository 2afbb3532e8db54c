//! Grouping keys, aggregators and post-aggregators

use tracing::debug;

use crate::builder::{QueryBuilder, ValueTransform};
use crate::extension::FunctionRegistry;
use crate::query::{
    AggregationSpec, ArithmeticFn, DimensionSpec, ExtractionFunctionSpec, FilterSpec,
    GranularitySpec, PostAggregationSpec, SimpleGranularity,
};
use crate::relation::EngineType;
use crate::sql::planner::{
    AggregateExpr, AggregateFunction, BinaryOperator, DataType, Expr, ScalarFunction, ScalarValue,
};

use super::filter::aggregate_output;

/// Result field holding the time bucket of each row
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Folds one grouping key. `None` when the key has no engine equivalent.
pub(crate) fn fold_group_key(
    builder: &QueryBuilder,
    functions: &FunctionRegistry,
    key: &Expr,
) -> Option<QueryBuilder> {
    match key {
        Expr::Column(name) => {
            if !builder.is_non_time_dimension(name) {
                return None;
            }
            let (next, column) = builder.resolve_column(name)?;
            Some(
                next.add_dimension(DimensionSpec::column(column.name.clone(), name.clone()))
                    .record_output_attribute(
                        name.clone(),
                        key.clone(),
                        column.data_type,
                        column.engine_type,
                        None,
                    ),
            )
        }
        Expr::ScalarFunc { func, args } if functions.supports(*func) => match (func, args.as_slice()) {
            (ScalarFunction::DateTrunc, [Expr::Literal(ScalarValue::Utf8(unit)), Expr::Column(name)]) => {
                // one bucket size per query
                if !builder.granularity().is_all() {
                    return None;
                }
                let granularity = SimpleGranularity::from_unit(unit)?;
                let (next, column) = builder.resolve_column(name)?;
                if !column.is_time() {
                    return None;
                }
                Some(
                    next.set_granularity(GranularitySpec::Simple(granularity))
                        .record_output_attribute(
                            TIMESTAMP_FIELD,
                            key.clone(),
                            DataType::Timestamp,
                            EngineType::Long,
                            Some(ValueTransform::ToTimestamp),
                        ),
                )
            }
            (ScalarFunction::Upper | ScalarFunction::Lower | ScalarFunction::Substring, [Expr::Column(name), rest @ ..]) => {
                let extraction_fn = extraction(*func, rest)?;
                if !builder.is_non_time_dimension(name) {
                    return None;
                }
                let (next, column) = builder.resolve_column(name)?;
                let output_name = key.to_string();
                Some(
                    next.add_dimension(DimensionSpec::Extraction {
                        dimension: column.name,
                        output_name: output_name.clone(),
                        extraction_fn,
                    })
                    .record_output_attribute(
                        output_name,
                        key.clone(),
                        DataType::Utf8,
                        EngineType::String,
                        None,
                    ),
                )
            }
            _ => None,
        },
        _ => None,
    }
}

fn extraction(func: ScalarFunction, rest: &[Expr]) -> Option<ExtractionFunctionSpec> {
    match (func, rest) {
        (ScalarFunction::Upper, []) => Some(ExtractionFunctionSpec::Upper {}),
        (ScalarFunction::Lower, []) => Some(ExtractionFunctionSpec::Lower {}),
        // SQL positions are 1-based
        (ScalarFunction::Substring, [Expr::Literal(start)]) => Some(ExtractionFunctionSpec::Substring {
            index: substring_index(start)?,
            length: None,
        }),
        (ScalarFunction::Substring, [Expr::Literal(start), Expr::Literal(length)]) => {
            Some(ExtractionFunctionSpec::Substring {
                index: substring_index(start)?,
                length: Some(usize::try_from(literal_i64(length)?).ok()?),
            })
        }
        _ => None,
    }
}

fn literal_i64(value: &ScalarValue) -> Option<i64> {
    match value {
        ScalarValue::Int32(v) => Some(i64::from(*v)),
        ScalarValue::Int64(v) => Some(*v),
        _ => None,
    }
}

fn substring_index(start: &ScalarValue) -> Option<usize> {
    usize::try_from(literal_i64(start)?.checked_sub(1)?).ok()
}

/// Folds one aggregate. `None` when it has no engine equivalent.
///
/// `avg` becomes a sum and a count under minted aliases, recorded for
/// reconstruction.
pub(crate) fn fold_aggregate(
    builder: &QueryBuilder,
    aggregate: &AggregateExpr,
    alias_prefix: &str,
) -> Option<QueryBuilder> {
    let name = aggregate.output_name();
    let expr = Expr::Aggregate(Box::new(aggregate.clone()));

    if aggregate.function == AggregateFunction::Count && !aggregate.distinct {
        let count = AggregationSpec::Count { name: name.clone() };
        let (next, spec) = match &aggregate.expr {
            Expr::Literal(value) if *value != ScalarValue::Null => (builder.clone(), count),
            Expr::Literal(_) => return None,
            // count(column) skips nulls, which only dimensions hold
            Expr::Column(column_name) => {
                let (next, column) = builder.resolve_column(column_name)?;
                let spec = if column.is_dimension(false) {
                    AggregationSpec::Filtered {
                        filter: FilterSpec::not(FilterSpec::selector(column.name, None)),
                        aggregator: Box::new(count),
                    }
                } else {
                    count
                };
                (next, spec)
            }
            _ => return None,
        };
        return Some(
            next.add_aggregation(spec)
                .record_output_attribute(name, expr, DataType::Int64, EngineType::Long, None),
        );
    }

    let Expr::Column(column_name) = &aggregate.expr else {
        return None;
    };
    let (next, column) = builder.resolve_column(column_name)?;

    if aggregate.distinct {
        if aggregate.function != AggregateFunction::Count {
            return None;
        }
        let spec = match &column.engine_type {
            EngineType::Complex(kind) if kind == "hyperUnique" => AggregationSpec::HyperUnique {
                name: name.clone(),
                field_name: column.name.clone(),
            },
            _ if column.is_dimension(false) => AggregationSpec::Cardinality {
                name: name.clone(),
                fields: vec![column.name.clone()],
                by_row: false,
            },
            _ => return None,
        };
        return Some(
            next.add_aggregation(spec)
                .record_output_attribute(name, expr, DataType::Int64, EngineType::Double, None),
        );
    }

    if !column.is_metric() || !column.engine_type.is_numeric() {
        return None;
    }
    let integral = column.engine_type.is_integral();
    let field_name = column.name.clone();
    let (spec, original_type, engine_type) = match aggregate.function {
        AggregateFunction::Sum | AggregateFunction::Min | AggregateFunction::Max => {
            let spec = numeric_aggregator(aggregate.function, integral, name.clone(), field_name)?;
            let types = if integral {
                (DataType::Int64, EngineType::Long)
            } else {
                (DataType::Float64, EngineType::Double)
            };
            (spec, types.0, types.1)
        }
        AggregateFunction::Avg => {
            let sum_alias = next.next_alias_with_prefix(alias_prefix);
            let count_alias = next.next_alias_with_prefix(alias_prefix);
            let sum = numeric_aggregator(AggregateFunction::Sum, integral, sum_alias.clone(), field_name)?;
            debug!(
                target: "pushdown",
                aggregate = %name,
                sum = %sum_alias,
                count = %count_alias,
                "average decomposed"
            );
            return Some(
                next.add_aggregation(sum)
                    .add_aggregation(AggregationSpec::Count {
                        name: count_alias.clone(),
                    })
                    .record_average_decomposition(expr.clone(), sum_alias, count_alias)
                    .record_output_attribute(name, expr, DataType::Float64, EngineType::Double, None),
            );
        }
        AggregateFunction::Count => return None,
    };
    Some(
        next.add_aggregation(spec)
            .record_output_attribute(name, expr, original_type, engine_type, None),
    )
}

fn numeric_aggregator(
    function: AggregateFunction,
    integral: bool,
    name: String,
    field_name: String,
) -> Option<AggregationSpec> {
    Some(match (function, integral) {
        (AggregateFunction::Sum, true) => AggregationSpec::LongSum { name, field_name },
        (AggregateFunction::Sum, false) => AggregationSpec::DoubleSum { name, field_name },
        (AggregateFunction::Min, true) => AggregationSpec::LongMin { name, field_name },
        (AggregateFunction::Min, false) => AggregationSpec::DoubleMin { name, field_name },
        (AggregateFunction::Max, true) => AggregationSpec::LongMax { name, field_name },
        (AggregateFunction::Max, false) => AggregationSpec::DoubleMax { name, field_name },
        _ => return None,
    })
}

/// Post-aggregation computing `expr` over aggregator outputs.
pub(crate) fn to_post_aggregation(
    builder: &QueryBuilder,
    expr: &Expr,
    name: String,
) -> Option<PostAggregationSpec> {
    match expr {
        Expr::BinaryOp { left, op, right } => {
            let function = match op {
                BinaryOperator::Plus => ArithmeticFn::Plus,
                BinaryOperator::Minus => ArithmeticFn::Minus,
                BinaryOperator::Multiply => ArithmeticFn::Multiply,
                // SQL division is plain division
                BinaryOperator::Divide => ArithmeticFn::Quotient,
                _ => return None,
            };
            let fields = vec![
                to_post_aggregation(builder, left, left.to_string())?,
                to_post_aggregation(builder, right, right.to_string())?,
            ];
            Some(PostAggregationSpec::Arithmetic {
                name,
                function,
                fields,
            })
        }
        Expr::Literal(value) => Some(PostAggregationSpec::Constant {
            name,
            value: value.as_f64()?,
        }),
        reference => {
            let field_name = aggregate_output(builder, reference)?;
            Some(PostAggregationSpec::FieldAccess { name, field_name })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::wikipedia_arc;

    fn builder() -> QueryBuilder {
        QueryBuilder::new(wikipedia_arc()).unwrap()
    }

    fn functions() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register("date_trunc", ScalarFunction::DateTrunc);
        registry.register("upper", ScalarFunction::Upper);
        registry.register("substring", ScalarFunction::Substring);
        registry
    }

    fn date_trunc(unit: &str) -> Expr {
        Expr::ScalarFunc {
            func: ScalarFunction::DateTrunc,
            args: vec![Expr::lit(unit), Expr::col("ts")],
        }
    }

    #[test]
    fn test_dimension_key() {
        let b = fold_group_key(&builder(), &functions(), &Expr::col("country")).unwrap();
        assert_eq!(b.dimensions(), &[DimensionSpec::column("countryName", "country")]);
        assert!(b.output_attribute("country").is_some());
    }

    #[test]
    fn test_metric_and_time_keys_rejected() {
        assert!(fold_group_key(&builder(), &functions(), &Expr::col("added")).is_none());
        assert!(fold_group_key(&builder(), &functions(), &Expr::col("ts")).is_none());
        assert!(fold_group_key(&builder(), &functions(), &Expr::col("nope")).is_none());
    }

    #[test]
    fn test_date_trunc_sets_granularity_once() {
        let b = fold_group_key(&builder(), &functions(), &date_trunc("DAY")).unwrap();
        assert_eq!(
            b.granularity(),
            &GranularitySpec::Simple(SimpleGranularity::Day)
        );
        assert_eq!(
            b.output_attribute(TIMESTAMP_FIELD).unwrap().transform,
            ValueTransform::ToTimestamp
        );
        assert!(fold_group_key(&b, &functions(), &date_trunc("hour")).is_none());
        assert!(fold_group_key(&builder(), &functions(), &date_trunc("fortnight")).is_none());
    }

    #[test]
    fn test_unregistered_function_rejected() {
        let key = date_trunc("day");
        assert!(fold_group_key(&builder(), &FunctionRegistry::new(), &key).is_none());
    }

    #[test]
    fn test_substring_extraction() {
        let key = Expr::ScalarFunc {
            func: ScalarFunction::Substring,
            args: vec![Expr::col("page"), Expr::lit(1i64), Expr::lit(3i64)],
        };
        let b = fold_group_key(&builder(), &functions(), &key).unwrap();
        match &b.dimensions()[0] {
            DimensionSpec::Extraction { extraction_fn, .. } => assert_eq!(
                extraction_fn,
                &ExtractionFunctionSpec::Substring {
                    index: 0,
                    length: Some(3)
                }
            ),
            other => panic!("Expected extraction dimension, got: {:?}", other),
        }
    }

    #[test]
    fn test_sum_picks_engine_type() {
        let long = AggregateExpr::new(AggregateFunction::Sum, Expr::col("added")).with_alias("total");
        let b = fold_aggregate(&builder(), &long, "alias").unwrap();
        assert_eq!(
            b.aggregations(),
            &[AggregationSpec::LongSum {
                name: "total".into(),
                field_name: "added".into()
            }]
        );

        let double = AggregateExpr::new(AggregateFunction::Max, Expr::col("delta")).with_alias("peak");
        let b = fold_aggregate(&builder(), &double, "alias").unwrap();
        assert!(matches!(b.aggregations()[0], AggregationSpec::DoubleMax { .. }));
    }

    #[test]
    fn test_avg_decomposes() {
        let avg = AggregateExpr::new(AggregateFunction::Avg, Expr::col("added")).with_alias("mean");
        let b = fold_aggregate(&builder(), &avg, "a").unwrap();
        let names: Vec<&str> = b.aggregations().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["a-1", "a-2"]);
        let decomposition = b
            .average_decomposition(&Expr::Aggregate(Box::new(avg)))
            .unwrap();
        assert_eq!(decomposition.sum_alias, "a-1");
        assert_eq!(decomposition.count_alias, "a-2");
    }

    #[test]
    fn test_count_variants() {
        let star = AggregateExpr::new(AggregateFunction::Count, Expr::lit(1i64)).with_alias("n");
        let b = fold_aggregate(&builder(), &star, "alias").unwrap();
        assert_eq!(b.aggregations(), &[AggregationSpec::Count { name: "n".into() }]);

        let distinct = AggregateExpr::new(AggregateFunction::Count, Expr::col("page"))
            .with_distinct()
            .with_alias("pages");
        let b = fold_aggregate(&builder(), &distinct, "alias").unwrap();
        assert!(matches!(b.aggregations()[0], AggregationSpec::Cardinality { .. }));

        let nullable = AggregateExpr::new(AggregateFunction::Count, Expr::col("page")).with_alias("c");
        let b = fold_aggregate(&builder(), &nullable, "alias").unwrap();
        assert_eq!(
            b.aggregations(),
            &[AggregationSpec::Filtered {
                filter: FilterSpec::not(FilterSpec::selector("page", None)),
                aggregator: Box::new(AggregationSpec::Count { name: "c".into() }),
            }]
        );
        assert_eq!(b.aggregations()[0].name(), "c");
    }

    #[test]
    fn test_sum_of_dimension_rejected() {
        let agg = AggregateExpr::new(AggregateFunction::Sum, Expr::col("page"));
        assert!(fold_aggregate(&builder(), &agg, "alias").is_none());
    }

    #[test]
    fn test_post_aggregation_over_outputs() {
        let b = builder().add_aggregation(AggregationSpec::LongSum {
            name: "total".into(),
            field_name: "added".into(),
        });
        let expr = Expr::binary(Expr::col("total"), BinaryOperator::Divide, Expr::lit(2.0));
        let post = to_post_aggregation(&b, &expr, "half".into()).unwrap();
        assert_eq!(post.name(), "half");
        assert_eq!(post.dependencies(), vec!["total"]);

        let bad = Expr::binary(Expr::col("page"), BinaryOperator::Plus, Expr::lit(1i64));
        assert!(to_post_aggregation(&b, &bad, "x".into()).is_none());
    }
}
