//! Coercion of engine result values back into host types

use chrono::DateTime;
use serde_json::Value;

use crate::relation::EngineType;
use crate::sql::planner::{DataType, Expr, ScalarValue};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// How one raw engine value becomes a host value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTransform {
    Identity,
    ToTimestamp,
    ToDate,
    ToInt32,
    ToInt64,
    ToFloat64,
    ToUtf8,
    ToBoolean,
}

impl ValueTransform {
    pub fn name(&self) -> &'static str {
        match self {
            ValueTransform::Identity => "identity",
            ValueTransform::ToTimestamp => "toTimestamp",
            ValueTransform::ToDate => "toDate",
            ValueTransform::ToInt32 => "toInt",
            ValueTransform::ToInt64 => "toLong",
            ValueTransform::ToFloat64 => "toDouble",
            ValueTransform::ToUtf8 => "toString",
            ValueTransform::ToBoolean => "toBoolean",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            ValueTransform::Identity,
            ValueTransform::ToTimestamp,
            ValueTransform::ToDate,
            ValueTransform::ToInt32,
            ValueTransform::ToInt64,
            ValueTransform::ToFloat64,
            ValueTransform::ToUtf8,
            ValueTransform::ToBoolean,
        ]
        .into_iter()
        .find(|t| t.name() == name)
    }

    /// Transform implied by the host type the plan expects.
    pub fn default_for(original_type: DataType, engine_type: &EngineType) -> Self {
        match original_type {
            DataType::Timestamp => ValueTransform::ToTimestamp,
            DataType::Date => ValueTransform::ToDate,
            DataType::Int32 => ValueTransform::ToInt32,
            DataType::Int64 if engine_type.is_integral() => ValueTransform::Identity,
            DataType::Int64 => ValueTransform::ToInt64,
            DataType::Float64 => ValueTransform::ToFloat64,
            DataType::Utf8 if *engine_type == EngineType::String => ValueTransform::Identity,
            DataType::Utf8 => ValueTransform::ToUtf8,
            DataType::Boolean => ValueTransform::ToBoolean,
            DataType::Null => ValueTransform::Identity,
        }
    }

    /// Unconvertible values become `Null`.
    pub fn apply(&self, value: &Value) -> ScalarValue {
        if value.is_null() {
            return ScalarValue::Null;
        }
        let converted = match self {
            ValueTransform::Identity => Some(natural(value)),
            ValueTransform::ToTimestamp => epoch_millis(value).map(ScalarValue::Timestamp),
            ValueTransform::ToDate => epoch_millis(value)
                .and_then(|ms| i32::try_from(ms.div_euclid(MILLIS_PER_DAY)).ok())
                .map(ScalarValue::Date),
            ValueTransform::ToInt32 => {
                as_i64(value).and_then(|v| i32::try_from(v).ok()).map(ScalarValue::Int32)
            }
            ValueTransform::ToInt64 => as_i64(value).map(ScalarValue::Int64),
            ValueTransform::ToFloat64 => as_f64(value).map(ScalarValue::Float64),
            ValueTransform::ToUtf8 => Some(ScalarValue::Utf8(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })),
            ValueTransform::ToBoolean => match value {
                Value::Bool(b) => Some(ScalarValue::Boolean(*b)),
                Value::String(s) => s.parse().ok().map(ScalarValue::Boolean),
                Value::Number(n) => n.as_f64().map(|f| ScalarValue::Boolean(f != 0.0)),
                _ => None,
            },
        };
        converted.unwrap_or(ScalarValue::Null)
    }
}

fn natural(value: &Value) -> ScalarValue {
    match value {
        Value::Bool(b) => ScalarValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ScalarValue::Int64(i),
            None => n.as_f64().map_or(ScalarValue::Null, ScalarValue::Float64),
        },
        Value::String(s) => ScalarValue::Utf8(s.clone()),
        _ => ScalarValue::Utf8(value.to_string()),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .ok()
            .or_else(|| s.parse().ok()),
        _ => None,
    }
}

/// How one output attribute is read back from engine rows
#[derive(Debug, Clone, PartialEq)]
pub struct OutputAttribute {
    /// Expression in the original plan
    pub expr: Expr,
    pub original_type: DataType,
    pub engine_type: EngineType,
    pub transform: ValueTransform,
}

/// `avg(x)` rebuilt as `sum_alias / count_alias`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AverageDecomposition {
    pub sum_alias: String,
    pub count_alias: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_transforms() {
        assert_eq!(
            ValueTransform::default_for(DataType::Timestamp, &EngineType::Long),
            ValueTransform::ToTimestamp
        );
        assert_eq!(
            ValueTransform::default_for(DataType::Int64, &EngineType::Long),
            ValueTransform::Identity
        );
        assert_eq!(
            ValueTransform::default_for(DataType::Int64, &EngineType::Double),
            ValueTransform::ToInt64
        );
        assert_eq!(
            ValueTransform::default_for(DataType::Utf8, &EngineType::String),
            ValueTransform::Identity
        );
    }

    #[test]
    fn test_names_are_stable() {
        for t in [ValueTransform::ToDate, ValueTransform::ToFloat64, ValueTransform::Identity] {
            assert_eq!(ValueTransform::from_name(t.name()), Some(t));
        }
        assert_eq!(ValueTransform::from_name("bogus"), None);
    }

    #[test]
    fn test_timestamp_from_iso_string() {
        let v = ValueTransform::ToTimestamp.apply(&json!("2020-01-10T00:00:00.000Z"));
        assert_eq!(v, ScalarValue::Timestamp(1_578_614_400_000));
    }

    #[test]
    fn test_date_from_epoch_millis() {
        let v = ValueTransform::ToDate.apply(&json!(1_578_614_400_000i64));
        assert_eq!(v, ScalarValue::Date(18_271));
    }

    #[test]
    fn test_narrowing_overflow_is_null() {
        assert_eq!(
            ValueTransform::ToInt32.apply(&json!(i64::MAX)),
            ScalarValue::Null
        );
        assert_eq!(ValueTransform::ToInt32.apply(&json!(42.9)), ScalarValue::Int32(42));
    }

    #[test]
    fn test_null_passes_through() {
        assert_eq!(ValueTransform::ToFloat64.apply(&Value::Null), ScalarValue::Null);
        assert_eq!(ValueTransform::Identity.apply(&json!(1.5)), ScalarValue::Float64(1.5));
    }
}
