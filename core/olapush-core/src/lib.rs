//! # olapush: Query Push-down Planner
//!
//! olapush는 호스트 엔진의 논리 플랜을 외부 컬럼형 집계 엔진이 직접 실행할 수
//! 있는 쿼리 명세로 변환합니다. 시간 범위, 차원 그룹핑, 필터, 집계,
//! 후처리 집계, 정렬과 제한을 엔진으로 내려보내고, 내려보낼 수 없는 부분은
//! 반환된 행 위에서 호출자가 평가하도록 표시합니다.
//!
//! ## 주요 특징
//!
//! - **불변 QueryBuilder**: 모든 fold 연산이 새 값을 반환하므로 공유 접두사를
//!   여러 스레드에서 락 없이 분기 탐색 가능
//! - **구간 대수**: 시간 조건을 반열린 구간 `[start, end)` 집합에 정확히 교차
//! - **점진적 강등**: 표현 불가능한 조각은 unpushed 플래그, 불가능한 분기는 `None`
//! - **확장 모듈**: 함수, 옵티마이저 규칙, 파서 확장, 실행 전략을 모듈로 등록
//!
//! ## 빠른 시작
//!
//! ```rust
//! use std::sync::Arc;
//! use olapush_core::{
//!     BinaryOperator, EngineColumn, Expr, InMemoryCatalog, LogicalPlan, PlannerConfig,
//!     PushdownPlanner, RelationInfo, TimeInterval,
//! };
//!
//! # fn main() -> olapush_core::PlannerResult<()> {
//! // 2020년 1월 데이터를 가진 relation 등록
//! let mut catalog = InMemoryCatalog::new();
//! catalog.register(
//!     RelationInfo::new("wikipedia", "ts")
//!         .with_time_range(TimeInterval::from_millis(1_577_836_800_000, 1_580_515_200_000).unwrap())
//!         .with_column("ts", EngineColumn::time("__time"))
//!         .with_column("page", EngineColumn::dimension("page")),
//! )?;
//!
//! let planner = PushdownPlanner::new(Arc::new(catalog), PlannerConfig::default())?;
//!
//! // SELECT page FROM wikipedia WHERE page = 'Main_Page'
//! let plan = LogicalPlan::Filter {
//!     input: Box::new(LogicalPlan::Scan {
//!         table: "wikipedia".into(),
//!         columns: vec!["page".into()],
//!         filter: None,
//!     }),
//!     predicate: Expr::binary(Expr::col("page"), BinaryOperator::Eq, Expr::lit("Main_Page")),
//! };
//!
//! let planned = planner.plan(&plan)?.expect("time range is not empty");
//! assert_eq!(planned.query.query_type(), "scan");
//! assert!(!planned.needs_residual());
//! # Ok(())
//! # }
//! ```
//!
//! ## 아키텍처
//!
//! ```text
//! LogicalPlan → pre-analysis → Optimizer → PushdownStrategy (fold)
//!            → QueryBuilder → QuerySpec (JSON) → engine rows → RowMapper
//! ```
//!
//! ## 모듈 구조
//!
//! - [`interval`]: 시간 구간 대수 ([`QueryIntervals`])
//! - [`query`]: 엔진 쿼리 조각 (필터, 차원, 집계, 정렬/제한)
//! - [`builder`]: 불변 [`QueryBuilder`] 와 alias 생성기
//! - [`pushdown`]: 플랜을 builder로 접는 드라이버
//! - [`extension`]: 확장 모듈 레지스트리
//! - [`result`]: 엔진 결과 행 매핑

pub mod builder;
pub mod config;
pub mod error;
pub mod extension;
pub mod interval;
pub mod pushdown;
pub mod query;
pub mod relation;
pub mod result;
pub mod sql;

// Logging utilities
pub mod logging;

#[cfg(test)]
pub(crate) mod test_util;

// ===== Re-exports =====
pub use builder::{AliasGenerator, AverageDecomposition, OutputAttribute, QueryBuilder, ValueTransform};
pub use config::PlannerConfig;
pub use error::{PlannerError, PlannerResult};
pub use extension::{
    FunctionRegistry, LoadedModules, ParserExtension, PlannerModule, PlanningContext,
    PlanningStrategy, RuleContribution,
};
pub use interval::{IntervalCondition, IntervalConditionKind, QueryIntervals, TimeInterval};
pub use pushdown::{PushdownPlan, PushdownPlanner, PushdownStrategy};
pub use query::{
    AggregationSpec, DimensionSpec, FilterSpec, GranularitySpec, HavingSpec, LimitSpec,
    PostAggregationSpec, QuerySpec,
};
pub use relation::{
    ColumnKind, EngineColumn, EngineType, InMemoryCatalog, RelationInfo, RelationMetadataProvider,
};
pub use result::RowMapper;
pub use sql::{
    AggregateExpr, AggregateFunction, BinaryOperator, DataType, Expr, LogicalPlan, ScalarFunction,
    ScalarValue, SortExpr,
};
