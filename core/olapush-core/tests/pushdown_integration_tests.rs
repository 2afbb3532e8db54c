// Push-down 통합 테스트
// 전역 모듈 레지스트리, 설정 파일, 계획 → JSON → 결과 행 매핑까지 공개 API로 검증

use std::sync::Arc;

use olapush_core::extension::{self, BUILTIN_MODULE_NAME};
use olapush_core::sql::OptimizationRule;
use olapush_core::{
    AggregateExpr, AggregateFunction, BinaryOperator, DataType, EngineColumn, EngineType, Expr,
    InMemoryCatalog, LogicalPlan, PlannerConfig, PlannerError, PlannerModule, PlannerResult,
    PushdownPlanner, RelationInfo, RowMapper, ScalarValue, SortExpr, TimeInterval,
};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Tests that load modules share the process-wide registry.
static REGISTRY_LOCK: Mutex<()> = parking_lot::const_mutex(());

// 2020-01-01 .. 2020-02-01
const JAN_START: i64 = 1_577_836_800_000;
const JAN_END: i64 = 1_580_515_200_000;
const JAN_10: i64 = 1_578_614_400_000;

fn catalog() -> Arc<InMemoryCatalog> {
    let mut catalog = InMemoryCatalog::new();
    catalog
        .register(
            RelationInfo::new("wikipedia", "ts")
                .with_data_source("wiki_edits")
                .with_time_range(TimeInterval::from_millis(JAN_START, JAN_END).unwrap())
                .with_column("ts", EngineColumn::time("__time"))
                .with_column("page", EngineColumn::dimension("page"))
                .with_column("country", EngineColumn::dimension("countryName"))
                .with_column(
                    "added",
                    EngineColumn::metric("added", DataType::Int64, EngineType::Long),
                ),
        )
        .unwrap();
    Arc::new(catalog)
}

fn scan(table: &str) -> LogicalPlan {
    LogicalPlan::Scan {
        table: table.into(),
        columns: vec![],
        filter: None,
    }
}

/// `wiki` is accepted as a short name for `wikipedia`.
struct TableAlias;

impl OptimizationRule for TableAlias {
    fn name(&self) -> &str {
        "TableAlias"
    }

    fn apply(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan> {
        plan.map_children(|child| self.apply(child)).map(|plan| match plan {
            LogicalPlan::Scan {
                table,
                columns,
                filter,
            } if table == "wiki" => LogicalPlan::Scan {
                table: "wikipedia".into(),
                columns,
                filter,
            },
            other => other,
        })
    }
}

struct AliasModule;

impl PlannerModule for AliasModule {
    fn name(&self) -> &str {
        "table_alias"
    }

    fn pre_analysis_transform(&self) -> Option<Arc<dyn OptimizationRule>> {
        Some(Arc::new(TableAlias))
    }
}

#[test]
fn test_planner_loads_builtin_module() {
    let _guard = REGISTRY_LOCK.lock();
    extension::reset();

    let planner = PushdownPlanner::new(catalog(), PlannerConfig::default()).unwrap();
    assert_eq!(planner.modules().module_names(), vec![BUILTIN_MODULE_NAME]);
    assert!(planner.modules().functions().resolve("date_trunc").is_some());

    extension::reset();
}

#[test]
fn test_registered_module_rewrites_before_planning() {
    let _guard = REGISTRY_LOCK.lock();
    extension::reset();
    extension::register_module(Arc::new(AliasModule)).unwrap();

    let config = PlannerConfig::new().with_module("table_alias");
    let planner = PushdownPlanner::new(catalog(), config).unwrap();
    let planned = planner.plan(&scan("wiki")).unwrap().unwrap();
    assert_eq!(planned.builder.relation().name(), "wikipedia");

    extension::reset();
}

#[test]
fn test_unregistered_module_fails_planner_construction() {
    let _guard = REGISTRY_LOCK.lock();
    extension::reset();

    let config = PlannerConfig::new().with_module("geo");
    assert!(matches!(
        PushdownPlanner::new(catalog(), config),
        Err(PlannerError::ModuleNotRegistered(name)) if name == "geo"
    ));

    extension::reset();
}

#[test]
fn test_config_file_drives_planner() {
    let _guard = REGISTRY_LOCK.lock();
    extension::reset();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf").join("planner.json");
    let config = PlannerConfig {
        push_having: false,
        ..PlannerConfig::default()
    };
    config.save_to_file(&path).unwrap();
    let loaded = PlannerConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);

    let planner = PushdownPlanner::new(catalog(), loaded).unwrap();
    let p = LogicalPlan::Filter {
        input: Box::new(LogicalPlan::Aggregate {
            input: Box::new(scan("wikipedia")),
            group_by: vec![Expr::col("page")],
            aggregates: vec![
                AggregateExpr::new(AggregateFunction::Sum, Expr::col("added")).with_alias("total"),
            ],
        }),
        predicate: Expr::binary(Expr::col("total"), BinaryOperator::Gt, Expr::lit(10i64)),
    };
    let planned = planner.plan(&p).unwrap().unwrap();
    assert!(planned.builder.having_spec().is_none());
    assert!(planned.needs_residual());

    extension::reset();
}

#[test]
fn test_top_pages_end_to_end() {
    olapush_core::logging::init_test();
    let _guard = REGISTRY_LOCK.lock();
    extension::reset();

    let planner = PushdownPlanner::new(catalog(), PlannerConfig::default()).unwrap();

    // SELECT page, avg(added) AS mean FROM wikipedia
    // WHERE ts >= '2020-01-10' AND country = 'Korea'
    // GROUP BY page ORDER BY page LIMIT 3
    let filtered = LogicalPlan::Filter {
        input: Box::new(scan("wikipedia")),
        predicate: Expr::binary(
            Expr::col("ts"),
            BinaryOperator::GtEq,
            Expr::Literal(ScalarValue::Timestamp(JAN_10)),
        )
        .and(Expr::binary(
            Expr::col("country"),
            BinaryOperator::Eq,
            Expr::lit("Korea"),
        )),
    };
    let aggregated = LogicalPlan::Aggregate {
        input: Box::new(filtered),
        group_by: vec![Expr::col("page")],
        aggregates: vec![
            AggregateExpr::new(AggregateFunction::Avg, Expr::col("added")).with_alias("mean"),
        ],
    };
    let p = LogicalPlan::Limit {
        input: Box::new(LogicalPlan::Sort {
            input: Box::new(aggregated),
            order_by: vec![SortExpr {
                expr: Expr::col("page"),
                asc: true,
            }],
        }),
        count: 3,
        offset: 0,
    };

    let planned = planner.plan(&p).unwrap().unwrap();
    assert!(!planned.needs_residual());

    let json: serde_json::Value = serde_json::from_str(&planned.query.to_json().unwrap()).unwrap();
    assert_eq!(json["queryType"], "groupBy");
    assert_eq!(json["dataSource"], "wiki_edits");
    assert_eq!(
        json["intervals"][0],
        "2020-01-10T00:00:00.000Z/2020-02-01T00:00:00.000Z"
    );
    assert_eq!(json["filter"]["dimension"], "countryName");
    assert_eq!(json["aggregations"][0]["name"], "alias-1");
    assert_eq!(json["aggregations"][1]["name"], "alias-2");
    assert_eq!(json["limitSpec"]["limit"], 3);

    // engine rows come back keyed by output name and synthetic alias
    let mapper = RowMapper::new(&planned.builder);
    assert_eq!(mapper.fields(), vec!["page", "mean"]);
    let rows = mapper
        .map_json(
            r#"[
                {"page": "Seoul", "alias-1": 30, "alias-2": 4},
                {"page": "Busan", "alias-1": 0, "alias-2": 0}
            ]"#,
        )
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![
                ("page".to_string(), ScalarValue::Utf8("Seoul".into())),
                ("mean".to_string(), ScalarValue::Float64(7.5)),
            ],
            vec![
                ("page".to_string(), ScalarValue::Utf8("Busan".into())),
                ("mean".to_string(), ScalarValue::Null),
            ],
        ]
    );

    extension::reset();
}

#[test]
fn test_disjoint_time_filter_prunes_plan() {
    let _guard = REGISTRY_LOCK.lock();
    extension::reset();

    let planner = PushdownPlanner::new(catalog(), PlannerConfig::default()).unwrap();
    let p = LogicalPlan::Filter {
        input: Box::new(scan("wikipedia")),
        predicate: Expr::binary(
            Expr::col("ts"),
            BinaryOperator::Lt,
            Expr::Literal(ScalarValue::Timestamp(JAN_START)),
        ),
    };
    assert!(planner.plan(&p).unwrap().is_none());

    extension::reset();
}
