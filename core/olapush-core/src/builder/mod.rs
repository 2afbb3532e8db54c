//! Query builder
//!
//! `QueryBuilder` is an immutable value holding one in-progress translation
//! of a host plan into an engine query. Every fold returns a new builder;
//! the receiver is never changed, so a prefix builder can be shared across
//! alternative plan branches and threads without locking.
//!
//! Folds signal three outcomes:
//! - a new builder: the fragment was pushed;
//! - a new builder with an unpushed flag: the fragment stays in the host
//!   plan and is evaluated over the returned rows;
//! - `None`: the branch is unsatisfiable (empty time range, conflicting
//!   limits) and must be pruned.

mod alias;
mod output;


use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{PlannerError, PlannerResult};
use crate::interval::{IntervalCondition, QueryIntervals};
use crate::query::{
    AggregationSpec, DimensionSpec, FilterSpec, GranularitySpec, HavingSpec, LimitSpec,
    OrderByColumnSpec, PostAggregationSpec, QuerySpec,
};
use crate::relation::{EngineColumn, EngineType, RelationInfo, RelationMetadataProvider};
use crate::sql::planner::{DataType, Expr, LogicalPlan, ScalarValue};

pub use alias::{ALIAS_COUNTER_START, AliasGenerator, DEFAULT_ALIAS_PREFIX};
pub use output::{AverageDecomposition, OutputAttribute, ValueTransform};

/// One in-progress push-down translation
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    relation: Arc<RelationInfo>,
    query_intervals: QueryIntervals,
    /// output name → engine column, for every column resolved so far
    referenced_columns: BTreeMap<String, EngineColumn>,
    dimensions: Vec<DimensionSpec>,
    limit_spec: Option<LimitSpec>,
    having_spec: Option<HavingSpec>,
    granularity: GranularitySpec,
    filter_spec: Option<FilterSpec>,
    aggregations: Vec<AggregationSpec>,
    post_aggregations: Option<Vec<PostAggregationSpec>>,
    /// projected alias → underlying source column
    projection_aliases: BTreeMap<String, String>,
    /// attribute id → read-back rule, in recording order
    output_attributes: Vec<(String, OutputAttribute)>,
    average_expressions: Vec<(Expr, AverageDecomposition)>,
    literal_expressions: Vec<(Expr, ScalarValue)>,
    aggregate_operator: Option<Arc<LogicalPlan>>,
    original_projections: Option<Vec<(Expr, Option<String>)>>,
    original_filter: Option<Expr>,
    aliases: AliasGenerator,
    has_unpushed_projections: bool,
    has_unpushed_filters: bool,
}

impl QueryBuilder {
    /// Seeds a builder from relation metadata.
    ///
    /// Fails with `InvalidRelation` when the metadata cannot seed a query.
    pub fn new(relation: Arc<RelationInfo>) -> PlannerResult<Self> {
        relation.validate()?;
        let query_intervals = relation.query_intervals()?;
        Ok(Self {
            relation,
            query_intervals,
            referenced_columns: BTreeMap::new(),
            dimensions: Vec::new(),
            limit_spec: None,
            having_spec: None,
            granularity: GranularitySpec::All,
            filter_spec: None,
            aggregations: Vec::new(),
            post_aggregations: None,
            projection_aliases: BTreeMap::new(),
            output_attributes: Vec::new(),
            average_expressions: Vec::new(),
            literal_expressions: Vec::new(),
            aggregate_operator: None,
            original_projections: None,
            original_filter: None,
            aliases: AliasGenerator::new(),
            has_unpushed_projections: false,
            has_unpushed_filters: false,
        })
    }

    /// Looks the relation up in `provider` and seeds a builder for it.
    pub fn for_relation(provider: &dyn RelationMetadataProvider, name: &str) -> PlannerResult<Self> {
        let relation = provider
            .relation(name)
            .ok_or_else(|| PlannerError::RelationNotFound(name.to_string()))?;
        Self::new(relation)
    }

    // ===== Accessors =====

    pub fn relation(&self) -> &Arc<RelationInfo> {
        &self.relation
    }

    pub fn query_intervals(&self) -> &QueryIntervals {
        &self.query_intervals
    }

    pub fn referenced_columns(&self) -> &BTreeMap<String, EngineColumn> {
        &self.referenced_columns
    }

    pub fn dimensions(&self) -> &[DimensionSpec] {
        &self.dimensions
    }

    pub fn limit_spec(&self) -> Option<&LimitSpec> {
        self.limit_spec.as_ref()
    }

    pub fn having_spec(&self) -> Option<&HavingSpec> {
        self.having_spec.as_ref()
    }

    pub fn granularity(&self) -> &GranularitySpec {
        &self.granularity
    }

    pub fn filter_spec(&self) -> Option<&FilterSpec> {
        self.filter_spec.as_ref()
    }

    pub fn aggregations(&self) -> &[AggregationSpec] {
        &self.aggregations
    }

    pub fn post_aggregations(&self) -> Option<&[PostAggregationSpec]> {
        self.post_aggregations.as_deref()
    }

    pub fn projection_aliases(&self) -> &BTreeMap<String, String> {
        &self.projection_aliases
    }

    pub fn output_attributes(&self) -> &[(String, OutputAttribute)] {
        &self.output_attributes
    }

    pub fn output_attribute(&self, id: &str) -> Option<&OutputAttribute> {
        self.output_attributes
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, attribute)| attribute)
    }

    pub fn average_expressions(&self) -> &[(Expr, AverageDecomposition)] {
        &self.average_expressions
    }

    pub fn aggregate_operator(&self) -> Option<&LogicalPlan> {
        self.aggregate_operator.as_deref()
    }

    pub fn original_projections(&self) -> Option<&[(Expr, Option<String>)]> {
        self.original_projections.as_deref()
    }

    pub fn original_filter(&self) -> Option<&Expr> {
        self.original_filter.as_ref()
    }

    pub fn has_unpushed_projections(&self) -> bool {
        self.has_unpushed_projections
    }

    pub fn has_unpushed_filters(&self) -> bool {
        self.has_unpushed_filters
    }

    /// Some part of the plan must be evaluated over the returned rows.
    pub fn has_unpushed_expressions(&self) -> bool {
        self.has_unpushed_projections || self.has_unpushed_filters
    }

    // ===== Column resolution =====

    /// Source column an output name stands for, through the alias chain.
    pub fn alias_target<'a>(&'a self, name: &'a str) -> &'a str {
        self.projection_aliases
            .get(name)
            .map(String::as_str)
            .unwrap_or(name)
    }

    /// Pure lookup of the engine column behind `name`.
    pub fn engine_column(&self, name: &str) -> Option<&EngineColumn> {
        self.relation.column(self.alias_target(name))
    }

    /// Resolves `name` and records the engine column as referenced.
    ///
    /// `None` when the name does not resolve; the caller must treat the
    /// containing expression as unpushable.
    pub fn resolve_column(&self, name: &str) -> Option<(Self, EngineColumn)> {
        let column = self.engine_column(name)?.clone();
        let mut next = self.clone();
        next.referenced_columns
            .insert(name.to_string(), column.clone());
        Some((next, column))
    }

    /// Resolves to a dimension that is not the time column.
    pub fn is_non_time_dimension(&self, name: &str) -> bool {
        self.engine_column(name)
            .is_some_and(|column| column.is_dimension(false))
    }

    /// Name is already produced by this query (dimension output,
    /// aggregator or post-aggregator).
    pub fn has_output_name(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d.output_name() == name)
            || self.aggregations.iter().any(|a| a.name() == name)
            || self
                .post_aggregations
                .iter()
                .flatten()
                .any(|p| p.name() == name)
    }

    /// Output of a decomposed average, rebuilt from its sum and count.
    pub fn is_reconstructed_average(&self, name: &str) -> bool {
        self.average_expressions.iter().any(|(expr, _)| match expr {
            Expr::Aggregate(aggregate) => aggregate.output_name() == name,
            _ => false,
        })
    }

    // ===== Folds =====

    /// Appends a grouping key; key order is result row order.
    pub fn add_dimension(&self, dimension: DimensionSpec) -> Self {
        let mut next = self.clone();
        next.dimensions.push(dimension);
        next
    }

    /// Installs or reconciles ordering and limit.
    ///
    /// A second request is accepted only when one side is still unbounded
    /// or both limits are equal; ordering columns accumulate. `None` when
    /// the limits conflict.
    pub fn set_limit(&self, limit: LimitSpec) -> Option<Self> {
        let merged = match &self.limit_spec {
            None => limit,
            Some(existing) => match existing.merge(&limit) {
                Some(merged) => merged,
                None => {
                    debug!(
                        target: "pushdown",
                        relation = self.relation.name(),
                        existing = existing.limit,
                        requested = limit.limit,
                        "conflicting limit, pruning branch"
                    );
                    return None;
                }
            },
        };
        let mut next = self.clone();
        next.limit_spec = Some(merged);
        Some(next)
    }

    /// Makes `columns` the leading sort keys. Columns already ordered on
    /// stay behind them as tie-breakers; the row limit is kept.
    pub fn order_by(&self, mut columns: Vec<OrderByColumnSpec>) -> Self {
        let limit = match &self.limit_spec {
            None => LimitSpec::UNBOUNDED,
            Some(existing) => {
                for column in &existing.columns {
                    if !columns.iter().any(|c| c.dimension == column.dimension) {
                        columns.push(column.clone());
                    }
                }
                existing.limit
            }
        };
        let mut next = self.clone();
        next.limit_spec = Some(LimitSpec::new(limit, columns));
        next
    }

    /// Fixes the row limit, keeping any ordering already set.
    pub fn limit_to(&self, count: usize) -> Option<Self> {
        self.set_limit(LimitSpec::new(count, Vec::new()))
    }

    /// A second having clause is ANDed with the first.
    pub fn set_having(&self, having: HavingSpec) -> Self {
        let mut next = self.clone();
        next.having_spec = Some(match self.having_spec.clone() {
            Some(existing) => HavingSpec::and(existing, having),
            None => having,
        });
        next
    }

    pub fn set_granularity(&self, granularity: GranularitySpec) -> Self {
        let mut next = self.clone();
        next.granularity = granularity;
        next
    }

    /// ANDs `filter` into the query filter.
    pub fn add_filter(&self, filter: FilterSpec) -> Self {
        let mut next = self.clone();
        next.filter_spec = Some(match self.filter_spec.clone() {
            Some(existing) => FilterSpec::and(existing, filter),
            None => filter,
        });
        next
    }

    pub fn add_aggregation(&self, aggregation: AggregationSpec) -> Self {
        let mut next = self.clone();
        next.aggregations.push(aggregation);
        next
    }

    /// Appends in arrival order; later post-aggregations may read earlier
    /// ones by name.
    pub fn add_post_aggregation(&self, post_aggregation: PostAggregationSpec) -> Self {
        let mut next = self.clone();
        next.post_aggregations
            .get_or_insert_with(Vec::new)
            .push(post_aggregation);
        next
    }

    /// Narrows the query intervals. `None` when nothing is left.
    pub fn restrict_interval(&self, condition: IntervalCondition) -> Option<Self> {
        match self.query_intervals.restrict(condition) {
            Some(query_intervals) => {
                let mut next = self.clone();
                next.query_intervals = query_intervals;
                Some(next)
            }
            None => {
                debug!(
                    target: "pushdown",
                    relation = self.relation.name(),
                    condition = ?condition,
                    "time restriction leaves no interval, pruning branch"
                );
                None
            }
        }
    }

    /// Records how attribute `id` is read back from engine rows.
    /// Re-recording an id replaces it in place.
    pub fn record_output_attribute(
        &self,
        id: impl Into<String>,
        expr: Expr,
        original_type: DataType,
        engine_type: EngineType,
        transform: Option<ValueTransform>,
    ) -> Self {
        let id = id.into();
        let transform =
            transform.unwrap_or_else(|| ValueTransform::default_for(original_type, &engine_type));
        let attribute = OutputAttribute {
            expr,
            original_type,
            engine_type,
            transform,
        };
        let mut next = self.clone();
        match next.output_attributes.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = attribute,
            None => next.output_attributes.push((id, attribute)),
        }
        next
    }

    /// Forgets every recorded output attribute.
    pub fn without_output_attributes(&self) -> Self {
        let mut next = self.clone();
        next.output_attributes.clear();
        next
    }

    /// Records that `expr` is rebuilt downstream as `sum / count`.
    pub fn record_average_decomposition(
        &self,
        expr: Expr,
        sum_alias: impl Into<String>,
        count_alias: impl Into<String>,
    ) -> Self {
        let decomposition = AverageDecomposition {
            sum_alias: sum_alias.into(),
            count_alias: count_alias.into(),
        };
        let mut next = self.clone();
        match next.average_expressions.iter_mut().find(|(e, _)| *e == expr) {
            Some((_, slot)) => *slot = decomposition,
            None => next.average_expressions.push((expr, decomposition)),
        }
        next
    }

    pub fn average_decomposition(&self, expr: &Expr) -> Option<&AverageDecomposition> {
        self.average_expressions
            .iter()
            .find(|(e, _)| e == expr)
            .map(|(_, d)| d)
    }

    /// Records a placeholder column whose value is a known literal.
    pub fn record_literal_expression(&self, expr: Expr, value: ScalarValue) -> Self {
        let mut next = self.clone();
        match next.literal_expressions.iter_mut().find(|(e, _)| *e == expr) {
            Some((_, slot)) => *slot = value,
            None => next.literal_expressions.push((expr, value)),
        }
        next
    }

    pub fn literal_for(&self, expr: &Expr) -> Option<&ScalarValue> {
        self.literal_expressions
            .iter()
            .find(|(e, _)| e == expr)
            .map(|(_, v)| v)
    }

    /// Makes `alias` stand for whatever `column` resolves to now. Later
    /// changes to `column`'s own alias do not affect `alias`.
    pub fn add_alias(&self, alias: impl Into<String>, column: &str) -> Self {
        let target = self.alias_target(column).to_string();
        let mut next = self.clone();
        next.projection_aliases.insert(alias.into(), target);
        next
    }

    pub fn with_aggregate_operator(&self, plan: LogicalPlan) -> Self {
        let mut next = self.clone();
        next.aggregate_operator = Some(Arc::new(plan));
        next
    }

    pub fn with_original_projections(&self, projections: Vec<(Expr, Option<String>)>) -> Self {
        let mut next = self.clone();
        next.original_projections = Some(projections);
        next
    }

    /// Residual filter re-applied over the returned rows.
    pub fn with_original_filter(&self, filter: Expr) -> Self {
        let mut next = self.clone();
        next.original_filter = Some(match self.original_filter.clone() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        next
    }

    pub fn with_unpushed_projections(&self) -> Self {
        let mut next = self.clone();
        next.has_unpushed_projections = true;
        next
    }

    pub fn with_unpushed_filters(&self) -> Self {
        let mut next = self.clone();
        next.has_unpushed_filters = true;
        next
    }

    // ===== Derived =====

    /// True while no post-aggregation, limit or having clause is present,
    /// i.e. the query may run as a plain historical scan. Once false it
    /// stays false for every builder derived from this one.
    pub fn push_to_historical_feasible(&self) -> bool {
        self.post_aggregations.is_none() && self.limit_spec.is_none() && self.having_spec.is_none()
    }

    /// Mints `alias<n>` with a decreasing counter.
    pub fn next_alias(&self) -> String {
        self.next_alias_with_prefix(DEFAULT_ALIAS_PREFIX)
    }

    /// Mints `<prefix><n>`, skipping names the relation or the alias
    /// chain already use.
    pub fn next_alias_with_prefix(&self, prefix: &str) -> String {
        self.aliases.next(prefix, |candidate| {
            self.relation.contains_column(candidate)
                || self.projection_aliases.contains_key(candidate)
        })
    }

    /// Assembles the engine request for this builder.
    ///
    /// Raw scan when nothing aggregates, timeseries when nothing groups or
    /// orders, group-by otherwise.
    pub fn build_query(&self) -> QuerySpec {
        let data_source = self.relation.data_source().to_string();
        let intervals = self.query_intervals.clone();
        let filter = self.filter_spec.clone();
        let post_aggregations = self.post_aggregations.clone().unwrap_or_default();

        if self.aggregations.is_empty() && self.dimensions.is_empty() {
            let mut columns: Vec<String> = self
                .referenced_columns
                .values()
                .map(|column| column.name.clone())
                .collect();
            columns.sort();
            columns.dedup();
            let limit = self
                .limit_spec
                .as_ref()
                .filter(|spec| spec.is_bounded())
                .map(|spec| spec.limit);
            return QuerySpec::Scan {
                data_source,
                columns,
                filter,
                limit,
                intervals,
            };
        }

        if self.dimensions.is_empty() && self.limit_spec.is_none() && self.having_spec.is_none() {
            return QuerySpec::Timeseries {
                data_source,
                granularity: self.granularity.clone(),
                filter,
                aggregations: self.aggregations.clone(),
                post_aggregations,
                intervals,
            };
        }

        QuerySpec::GroupBy {
            data_source,
            dimensions: self.dimensions.clone(),
            granularity: self.granularity.clone(),
            filter,
            aggregations: self.aggregations.clone(),
            post_aggregations,
            limit_spec: self.limit_spec.clone(),
            having: self.having_spec.clone(),
            intervals,
        }
    }
}
