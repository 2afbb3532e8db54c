//! 플랜 타입 정의
//!
//! 호스트 엔진의 LogicalPlan, Expr, ScalarValue 등 push-down 대상이 되는 타입들.

use std::fmt;

/// 논리 플랜: 호스트 쿼리의 논리적 표현
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// 테이블 스캔
    Scan {
        table: String,
        columns: Vec<String>,
        filter: Option<Expr>,
    },
    /// 컬럼 선택/계산
    Project {
        input: Box<LogicalPlan>,
        projections: Vec<(Expr, Option<String>)>,
    },
    /// WHERE 조건 필터
    Filter {
        input: Box<LogicalPlan>,
        predicate: Expr,
    },
    /// GROUP BY + 집계
    Aggregate {
        input: Box<LogicalPlan>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateExpr>,
    },
    /// JOIN
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        join_type: JoinType,
        on: Expr,
    },
    /// ORDER BY
    Sort {
        input: Box<LogicalPlan>,
        order_by: Vec<SortExpr>,
    },
    /// LIMIT/OFFSET
    Limit {
        input: Box<LogicalPlan>,
        count: usize,
        offset: usize,
    },
}

impl LogicalPlan {
    /// Operator name used in logs and errors
    pub fn operator_name(&self) -> &'static str {
        match self {
            LogicalPlan::Scan { .. } => "Scan",
            LogicalPlan::Project { .. } => "Project",
            LogicalPlan::Filter { .. } => "Filter",
            LogicalPlan::Aggregate { .. } => "Aggregate",
            LogicalPlan::Join { .. } => "Join",
            LogicalPlan::Sort { .. } => "Sort",
            LogicalPlan::Limit { .. } => "Limit",
        }
    }

    /// Direct children, left to right
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Scan { .. } => vec![],
            LogicalPlan::Join { left, right, .. } => vec![left, right],
            LogicalPlan::Project { input, .. }
            | LogicalPlan::Filter { input, .. }
            | LogicalPlan::Aggregate { input, .. }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. } => vec![input],
        }
    }

    /// Rebuilds this node with `f` applied to every direct child.
    pub fn map_children<E>(
        self,
        mut f: impl FnMut(LogicalPlan) -> Result<LogicalPlan, E>,
    ) -> Result<LogicalPlan, E> {
        Ok(match self {
            scan @ LogicalPlan::Scan { .. } => scan,
            LogicalPlan::Project { input, projections } => LogicalPlan::Project {
                input: Box::new(f(*input)?),
                projections,
            },
            LogicalPlan::Filter { input, predicate } => LogicalPlan::Filter {
                input: Box::new(f(*input)?),
                predicate,
            },
            LogicalPlan::Aggregate {
                input,
                group_by,
                aggregates,
            } => LogicalPlan::Aggregate {
                input: Box::new(f(*input)?),
                group_by,
                aggregates,
            },
            LogicalPlan::Join {
                left,
                right,
                join_type,
                on,
            } => LogicalPlan::Join {
                left: Box::new(f(*left)?),
                right: Box::new(f(*right)?),
                join_type,
                on,
            },
            LogicalPlan::Sort { input, order_by } => LogicalPlan::Sort {
                input: Box::new(f(*input)?),
                order_by,
            },
            LogicalPlan::Limit {
                input,
                count,
                offset,
            } => LogicalPlan::Limit {
                input: Box::new(f(*input)?),
                count,
                offset,
            },
        })
    }
}

/// 표현식: 컬럼, 리터럴, 연산자, 함수
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 컬럼 참조
    Column(String),
    /// 리터럴 값
    Literal(ScalarValue),
    /// 이항 연산 (+, -, *, /, =, !=, <, >, AND, OR)
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// 스칼라 함수 호출 (DATE_TRUNC, UPPER 등)
    ScalarFunc {
        func: ScalarFunction,
        args: Vec<Expr>,
    },
    /// 집계 함수 참조 (투영/정렬에서 집계 결과를 가리킬 때)
    Aggregate(Box<AggregateExpr>),
    /// IS NULL
    IsNull(Box<Expr>),
    /// IS NOT NULL
    IsNotNull(Box<Expr>),
    /// IN (...)
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// NOT
    Not(Box<Expr>),
}

impl Expr {
    /// Column reference shorthand
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    /// Literal shorthand
    pub fn lit(value: impl Into<ScalarValue>) -> Self {
        Expr::Literal(value.into())
    }

    /// Binary operation shorthand
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// `self AND other`
    pub fn and(self, other: Expr) -> Self {
        Expr::binary(self, BinaryOperator::And, other)
    }

    /// ANDs the predicates together; `None` for an empty list.
    pub fn conjunction(predicates: Vec<Expr>) -> Option<Expr> {
        predicates.into_iter().reduce(Expr::and)
    }

    /// Splits a predicate into its top-level AND conjuncts.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let mut out = left.conjuncts();
                out.extend(right.conjuncts());
                out
            }
            other => vec![other],
        }
    }

    /// Column names referenced anywhere in the expression.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => out.push(name),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::ScalarFunc { args, .. } => args.iter().for_each(|a| a.collect_columns(out)),
            Expr::Aggregate(agg) => agg.expr.collect_columns(out),
            Expr::IsNull(inner) | Expr::IsNotNull(inner) | Expr::Not(inner) => {
                inner.collect_columns(out)
            }
            Expr::InList { expr, list, .. } => {
                expr.collect_columns(out);
                list.iter().for_each(|e| e.collect_columns(out));
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::ScalarFunc { func, args } => {
                write!(f, "{:?}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Aggregate(agg) => write!(f, "{}", agg),
            Expr::IsNull(inner) => write!(f, "{} IS NULL", inner),
            Expr::IsNotNull(inner) => write!(f, "{} IS NOT NULL", inner),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{} {}IN (", expr, if *negated { "NOT " } else { "" })?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Expr::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

/// 이항 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // 산술
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    // 비교
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // 논리
    And,
    Or,
}

impl BinaryOperator {
    /// `a op b` rewritten as `b op' a`
    pub fn flip(self) -> Self {
        match self {
            BinaryOperator::Lt => BinaryOperator::Gt,
            BinaryOperator::LtEq => BinaryOperator::GtEq,
            BinaryOperator::Gt => BinaryOperator::Lt,
            BinaryOperator::GtEq => BinaryOperator::LtEq,
            other => other,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Plus
                | BinaryOperator::Minus
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        f.write_str(s)
    }
}

/// 집계 표현식
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub function: AggregateFunction,
    pub expr: Expr,
    pub distinct: bool,
    pub alias: Option<String>,
}

impl AggregateExpr {
    pub fn new(function: AggregateFunction, expr: Expr) -> Self {
        Self {
            function,
            expr,
            distinct: false,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Output name: the alias, or the rendered expression
    pub fn output_name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        write!(f, "{:?}({}{})", self.function, distinct, self.expr)
    }
}

/// 집계 함수
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// 스칼라 함수 (행별 처리)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunction {
    /// DATE_TRUNC('day', ts)
    DateTrunc,
    Upper,
    Lower,
    Substring,
    Abs,
}

/// JOIN 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

/// 정렬 표현식
#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    pub expr: Expr,
    pub asc: bool,
}

/// Host-side data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Boolean,
    Int32,
    Int64,
    Float64,
    Utf8,
    /// Milliseconds since the epoch, UTC
    Timestamp,
    /// Days since the epoch
    Date,
}

/// 리터럴 값
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    Boolean(bool),
    /// Milliseconds since the epoch, UTC
    Timestamp(i64),
    /// Days since the epoch
    Date(i32),
}

impl ScalarValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Null => DataType::Null,
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Utf8(_) => DataType::Utf8,
            ScalarValue::Boolean(_) => DataType::Boolean,
            ScalarValue::Timestamp(_) => DataType::Timestamp,
            ScalarValue::Date(_) => DataType::Date,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarValue::Int32(_) | ScalarValue::Int64(_) | ScalarValue::Float64(_)
        )
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int32(v) => Some(*v as f64),
            ScalarValue::Int64(v) => Some(*v as f64),
            ScalarValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Rendering used inside engine filters, which compare strings.
    /// `None` for SQL NULL.
    pub fn to_filter_string(&self) -> Option<String> {
        match self {
            ScalarValue::Null => None,
            ScalarValue::Int32(v) => Some(v.to_string()),
            ScalarValue::Int64(v) => Some(v.to_string()),
            ScalarValue::Float64(v) => Some(v.to_string()),
            ScalarValue::Utf8(v) => Some(v.clone()),
            ScalarValue::Boolean(v) => Some(v.to_string()),
            ScalarValue::Timestamp(v) => Some(v.to_string()),
            ScalarValue::Date(v) => Some(v.to_string()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Utf8(v) => write!(f, "'{}'", v),
            ScalarValue::Timestamp(v) => write!(f, "TIMESTAMP({})", v),
            ScalarValue::Date(v) => write!(f, "DATE({})", v),
            other => write!(f, "{}", other.to_filter_string().unwrap_or_default()),
        }
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Int32(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int64(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float64(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Utf8(v.to_string())
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Boolean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjuncts_flatten_nested_and() {
        let pred = Expr::col("a")
            .and(Expr::col("b"))
            .and(Expr::binary(Expr::col("c"), BinaryOperator::Or, Expr::col("d")));
        let parts = pred.conjuncts();
        assert_eq!(parts.len(), 3);
        assert!(matches!(
            parts[2],
            Expr::BinaryOp {
                op: BinaryOperator::Or,
                ..
            }
        ));
    }

    #[test]
    fn test_columns_collects_all_references() {
        let expr = Expr::InList {
            expr: Box::new(Expr::col("country")),
            list: vec![Expr::lit("US"), Expr::col("fallback")],
            negated: false,
        };
        assert_eq!(expr.columns(), vec!["country", "fallback"]);
    }

    #[test]
    fn test_aggregate_output_name() {
        let agg = AggregateExpr::new(AggregateFunction::Sum, Expr::col("added"));
        assert_eq!(agg.output_name(), "Sum(added)");
        assert_eq!(agg.with_alias("total").output_name(), "total");
    }

    #[test]
    fn test_flip_comparison() {
        assert_eq!(BinaryOperator::Lt.flip(), BinaryOperator::Gt);
        assert_eq!(BinaryOperator::GtEq.flip(), BinaryOperator::LtEq);
        assert_eq!(BinaryOperator::Eq.flip(), BinaryOperator::Eq);
    }
}
