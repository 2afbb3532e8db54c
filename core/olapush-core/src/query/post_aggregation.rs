//! Post-aggregators: arithmetic over aggregator outputs

use serde::Serialize;

/// Arithmetic operator of a post-aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArithmeticFn {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "*")]
    Multiply,
    /// Division that yields 0 on a zero divisor
    #[serde(rename = "/")]
    Divide,
    /// Plain floating-point division
    #[serde(rename = "quotient")]
    Quotient,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PostAggregationSpec {
    Arithmetic {
        name: String,
        #[serde(rename = "fn")]
        function: ArithmeticFn,
        fields: Vec<PostAggregationSpec>,
    },
    FieldAccess {
        name: String,
        field_name: String,
    },
    Constant {
        name: String,
        value: f64,
    },
    HyperUniqueCardinality {
        name: String,
        field_name: String,
    },
}

impl PostAggregationSpec {
    pub fn field_access(field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        PostAggregationSpec::FieldAccess {
            name: field_name.clone(),
            field_name,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PostAggregationSpec::Arithmetic { name, .. }
            | PostAggregationSpec::FieldAccess { name, .. }
            | PostAggregationSpec::Constant { name, .. }
            | PostAggregationSpec::HyperUniqueCardinality { name, .. } => name,
        }
    }

    /// Aggregator or post-aggregator names this one reads
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            PostAggregationSpec::Arithmetic { fields, .. } => {
                fields.iter().flat_map(PostAggregationSpec::dependencies).collect()
            }
            PostAggregationSpec::FieldAccess { field_name, .. }
            | PostAggregationSpec::HyperUniqueCardinality { field_name, .. } => vec![field_name],
            PostAggregationSpec::Constant { .. } => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ratio() -> PostAggregationSpec {
        PostAggregationSpec::Arithmetic {
            name: "ratio".into(),
            function: ArithmeticFn::Divide,
            fields: vec![
                PostAggregationSpec::field_access("added"),
                PostAggregationSpec::Constant {
                    name: "c".into(),
                    value: 2.0,
                },
            ],
        }
    }

    #[test]
    fn test_arithmetic_wire_shape() {
        assert_eq!(
            serde_json::to_value(ratio()).unwrap(),
            json!({
                "type": "arithmetic",
                "name": "ratio",
                "fn": "/",
                "fields": [
                    {"type": "fieldAccess", "name": "added", "fieldName": "added"},
                    {"type": "constant", "name": "c", "value": 2.0}
                ]
            })
        );
    }

    #[test]
    fn test_dependencies() {
        assert_eq!(ratio().dependencies(), vec!["added"]);
    }
}
