//! Push-down planner
//!
//! Walks a host `LogicalPlan` bottom-up and folds every operator into a
//! `QueryBuilder`. Operators the engine cannot run are left to residual
//! evaluation over the returned rows: the builder is flagged and every
//! operator above the first residual one stays residual too.

mod aggregate;
mod filter;


use std::sync::Arc;

use tracing::debug;

use crate::builder::QueryBuilder;
use crate::config::PlannerConfig;
use crate::error::{PlannerError, PlannerResult};
use crate::extension::{self, LoadedModules, PlanningContext, PlanningStrategy};
use crate::query::{LimitSpec, OrderByColumnSpec, QuerySpec, SortDirection};
use crate::relation::{EngineType, RelationMetadataProvider};
use crate::sql::optimizer::QueryOptimizer;
use crate::sql::planner::{AggregateExpr, DataType, Expr, LogicalPlan, SortExpr};

pub use aggregate::TIMESTAMP_FIELD;

/// Finished translation: the builder plus the request it produces
#[derive(Debug, Clone)]
pub struct PushdownPlan {
    pub builder: QueryBuilder,
    pub query: QuerySpec,
}

impl PushdownPlan {
    fn new(builder: QueryBuilder) -> Self {
        let query = builder.build_query();
        Self { builder, query }
    }

    /// Rows need residual evaluation after the engine returns them.
    pub fn needs_residual(&self) -> bool {
        self.builder.has_unpushed_expressions()
    }
}

/// The built-in planning strategy: fold the plan into one engine query.
#[derive(Debug, Default, Clone, Copy)]
pub struct PushdownStrategy;

impl PlanningStrategy for PushdownStrategy {
    fn name(&self) -> &str {
        "pushdown"
    }

    fn plan(
        &self,
        ctx: &PlanningContext<'_>,
        plan: &LogicalPlan,
    ) -> PlannerResult<Option<PushdownPlan>> {
        Ok(Folder { ctx }.fold(plan)?.map(PushdownPlan::new))
    }
}

/// 쿼리 플래너: 모듈 로드, 정규화, 전략 실행
pub struct PushdownPlanner {
    provider: Arc<dyn RelationMetadataProvider>,
    config: PlannerConfig,
    modules: Arc<LoadedModules>,
    optimizer: QueryOptimizer,
}

impl PushdownPlanner {
    /// Validates `config` and loads the extension modules it names.
    pub fn new(provider: Arc<dyn RelationMetadataProvider>, config: PlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        let modules = extension::load_modules(&config)?;
        Ok(Self::with_modules(provider, config, modules))
    }

    /// Uses an already loaded module set.
    pub fn with_modules(
        provider: Arc<dyn RelationMetadataProvider>,
        config: PlannerConfig,
        modules: Arc<LoadedModules>,
    ) -> Self {
        let optimizer = QueryOptimizer::with_modules(&modules);
        Self {
            provider,
            config,
            modules,
            optimizer,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn modules(&self) -> &LoadedModules {
        &self.modules
    }

    pub fn optimizer(&self) -> &QueryOptimizer {
        &self.optimizer
    }

    /// Normalises `plan` and hands it to each strategy in module order.
    ///
    /// `Ok(None)` when no strategy produced a query, which for the
    /// push-down strategy means the plan can match no row.
    pub fn plan(&self, plan: &LogicalPlan) -> PlannerResult<Option<PushdownPlan>> {
        let plan = self.modules.pre_analyze(plan.clone())?;
        let plan = self.optimizer.optimize(plan)?;
        let ctx = PlanningContext {
            provider: self.provider.as_ref(),
            config: &self.config,
            functions: self.modules.functions(),
        };
        for strategy in self.modules.planning_strategies() {
            if let Some(planned) = strategy.plan(&ctx, &plan)? {
                debug!(
                    target: "pushdown",
                    strategy = strategy.name(),
                    query_type = planned.query.query_type(),
                    residual = planned.needs_residual(),
                    "plan translated"
                );
                return Ok(Some(planned));
            }
        }
        Ok(None)
    }
}

/// One bottom-up walk. `Ok(None)` prunes the branch.
struct Folder<'a> {
    ctx: &'a PlanningContext<'a>,
}

impl Folder<'_> {
    fn fold(&self, plan: &LogicalPlan) -> PlannerResult<Option<QueryBuilder>> {
        match plan {
            LogicalPlan::Scan {
                table,
                columns,
                filter,
            } => {
                let mut builder = QueryBuilder::for_relation(self.ctx.provider, table)?;
                for column in columns {
                    builder = match builder.resolve_column(column) {
                        Some((next, _)) => next,
                        None => {
                            debug!(target: "pushdown", relation = %table, column = %column, "unknown scan column");
                            builder.with_unpushed_projections()
                        }
                    };
                }
                match filter {
                    Some(predicate) => Ok(self.fold_filter(builder, predicate)),
                    None => Ok(Some(builder)),
                }
            }
            LogicalPlan::Filter { input, predicate } => {
                Ok(self.fold(input)?.and_then(|b| self.fold_filter(b, predicate)))
            }
            LogicalPlan::Project { input, projections } => {
                Ok(self.fold(input)?.map(|b| self.fold_project(b, projections)))
            }
            LogicalPlan::Aggregate {
                group_by,
                aggregates,
                input,
            } => Ok(self
                .fold(input)?
                .map(|b| self.fold_aggregate(b, plan, group_by, aggregates))),
            LogicalPlan::Sort { input, order_by } => {
                Ok(self.fold(input)?.map(|b| self.fold_sort(b, order_by)))
            }
            LogicalPlan::Limit {
                input,
                count,
                offset,
            } => Ok(self
                .fold(input)?
                .map(|b| self.fold_limit(b, *count, *offset))),
            LogicalPlan::Join { .. } => Err(PlannerError::UnsupportedPlan {
                operator: plan.operator_name().to_string(),
                reason: "joins cannot be pushed into a single engine query".to_string(),
            }),
        }
    }

    /// Time bounds narrow the intervals, the rest become filters (below an
    /// aggregate) or having clauses (above one). What cannot be expressed
    /// stays as a residual filter.
    fn fold_filter(&self, builder: QueryBuilder, predicate: &Expr) -> Option<QueryBuilder> {
        if builder.has_unpushed_expressions() || builder.limit_spec().is_some_and(LimitSpec::is_bounded) {
            return Some(residual_filter(builder, predicate.clone()));
        }

        let above_aggregate = builder.aggregate_operator().is_some();
        let mut builder = builder;
        let mut residual = Vec::new();
        for conjunct in predicate.conjuncts() {
            if above_aggregate {
                match filter::to_having_spec(&builder, conjunct) {
                    Some(having) if self.ctx.config.push_having => builder = builder.set_having(having),
                    _ => residual.push(conjunct.clone()),
                }
                continue;
            }
            if let Some(conditions) = filter::interval_conditions(&builder, conjunct) {
                for condition in conditions {
                    builder = builder.restrict_interval(condition)?;
                }
                continue;
            }
            match filter::to_filter_spec(&builder, conjunct) {
                Some((next, spec)) => builder = next.add_filter(spec),
                None => residual.push(conjunct.clone()),
            }
        }

        Some(match Expr::conjunction(residual) {
            Some(rest) => residual_filter(builder, rest),
            None => builder,
        })
    }

    fn fold_project(&self, builder: QueryBuilder, projections: &[(Expr, Option<String>)]) -> QueryBuilder {
        if builder.has_unpushed_expressions() {
            return builder.with_unpushed_projections();
        }

        let above_aggregate = builder.aggregate_operator().is_some();
        let mut builder = builder.with_original_projections(projections.to_vec());
        for (expr, alias) in projections {
            let folded = match expr {
                Expr::Column(name) if above_aggregate => {
                    let target = builder.alias_target(name);
                    (builder.has_output_name(target) || builder.is_reconstructed_average(target))
                        .then(|| self.alias(&builder, alias, name))
                }
                Expr::Column(name) => builder.resolve_column(name).map(|(next, column)| {
                    let next = self.alias(&next, alias, name);
                    next.record_output_attribute(
                        column.name.clone(),
                        expr.clone(),
                        column.data_type,
                        column.engine_type,
                        None,
                    )
                }),
                Expr::Literal(value) => Some(builder.record_literal_expression(expr.clone(), value.clone())),
                Expr::Aggregate(_) if above_aggregate => filter::aggregate_output(&builder, expr)
                    .map(|name| self.alias(&builder, alias, &name)),
                Expr::BinaryOp { op, .. }
                    if above_aggregate && op.is_arithmetic() && self.ctx.config.push_post_aggregations =>
                {
                    let name = alias.clone().unwrap_or_else(|| expr.to_string());
                    aggregate::to_post_aggregation(&builder, expr, name.clone()).map(|post| {
                        builder.add_post_aggregation(post).record_output_attribute(
                            name,
                            expr.clone(),
                            DataType::Float64,
                            EngineType::Double,
                            None,
                        )
                    })
                }
                _ => None,
            };
            builder = match folded {
                Some(next) => next,
                None => {
                    debug!(target: "pushdown", expr = %expr, "projection left to residual evaluation");
                    builder.with_unpushed_projections()
                }
            };
        }
        builder
    }

    fn alias(&self, builder: &QueryBuilder, alias: &Option<String>, name: &str) -> QueryBuilder {
        match alias {
            Some(alias) if alias != name => builder.add_alias(alias.clone(), name),
            _ => builder.clone(),
        }
    }

    /// All keys and aggregates push, or the whole aggregate is residual
    /// on top of the input builder.
    fn fold_aggregate(
        &self,
        builder: QueryBuilder,
        plan: &LogicalPlan,
        group_by: &[Expr],
        aggregates: &[AggregateExpr],
    ) -> QueryBuilder {
        if builder.has_unpushed_expressions()
            || builder.aggregate_operator().is_some()
            || builder.limit_spec().is_some()
        {
            return builder.with_unpushed_projections();
        }

        // pre-aggregate columns are not in grouped rows
        let folded = group_by
            .iter()
            .try_fold(builder.without_output_attributes(), |b, key| {
                aggregate::fold_group_key(&b, self.ctx.functions, key)
            })
            .and_then(|b| {
                aggregates.iter().try_fold(b, |b, agg| {
                    aggregate::fold_aggregate(&b, agg, &self.ctx.config.alias_prefix)
                })
            });

        match folded {
            Some(next) => next.with_aggregate_operator(plan.clone()),
            None => {
                debug!(
                    target: "pushdown",
                    relation = builder.relation().name(),
                    "aggregate left to residual evaluation"
                );
                builder.with_unpushed_projections()
            }
        }
    }

    /// Ordering on group keys or aggregate outputs.
    fn fold_sort(&self, builder: QueryBuilder, order_by: &[SortExpr]) -> QueryBuilder {
        if builder.has_unpushed_expressions()
            || builder.aggregate_operator().is_none()
            || builder.limit_spec().is_some_and(LimitSpec::is_bounded)
        {
            return builder.with_unpushed_projections();
        }

        let columns = order_by
            .iter()
            .map(|sort| {
                let name = match &sort.expr {
                    Expr::Column(name) => {
                        let target = builder.alias_target(name);
                        builder.has_output_name(target).then(|| target.to_string())
                    }
                    other => filter::aggregate_output(&builder, other),
                }?;
                let direction = if sort.asc {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                };
                Some(OrderByColumnSpec::new(name, direction))
            })
            .collect::<Option<Vec<_>>>();

        match columns {
            Some(columns) => builder.order_by(columns),
            None => builder.with_unpushed_projections(),
        }
    }

    /// A limit that conflicts with one already pushed is applied over the
    /// returned rows; it never prunes the plan.
    fn fold_limit(&self, builder: QueryBuilder, count: usize, offset: usize) -> QueryBuilder {
        if builder.has_unpushed_expressions() || offset != 0 {
            debug!(target: "pushdown", limit = count, offset, "limit left to residual evaluation");
            return builder.with_unpushed_projections();
        }
        match builder.limit_to(count) {
            Some(next) => next,
            None => {
                debug!(target: "pushdown", limit = count, "limit conflicts with pushed limit, left to residual evaluation");
                builder.with_unpushed_projections()
            }
        }
    }
}

fn residual_filter(builder: QueryBuilder, predicate: Expr) -> QueryBuilder {
    debug!(target: "pushdown", predicate = %predicate, "filter left to residual evaluation");
    builder.with_unpushed_filters().with_original_filter(predicate)
}
