//! Aggregators

use serde::Serialize;

use super::filter::FilterSpec;

/// One engine aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AggregationSpec {
    Count {
        name: String,
    },
    LongSum {
        name: String,
        field_name: String,
    },
    DoubleSum {
        name: String,
        field_name: String,
    },
    LongMin {
        name: String,
        field_name: String,
    },
    LongMax {
        name: String,
        field_name: String,
    },
    DoubleMin {
        name: String,
        field_name: String,
    },
    DoubleMax {
        name: String,
        field_name: String,
    },
    /// Approximate distinct count over dimensions
    Cardinality {
        name: String,
        fields: Vec<String>,
        by_row: bool,
    },
    /// Approximate distinct count over a pre-aggregated sketch column
    HyperUnique {
        name: String,
        field_name: String,
    },
    /// Aggregates only the rows matching `filter`
    Filtered {
        filter: FilterSpec,
        aggregator: Box<AggregationSpec>,
    },
}

impl AggregationSpec {
    /// Output name in result rows
    pub fn name(&self) -> &str {
        match self {
            AggregationSpec::Count { name }
            | AggregationSpec::LongSum { name, .. }
            | AggregationSpec::DoubleSum { name, .. }
            | AggregationSpec::LongMin { name, .. }
            | AggregationSpec::LongMax { name, .. }
            | AggregationSpec::DoubleMin { name, .. }
            | AggregationSpec::DoubleMax { name, .. }
            | AggregationSpec::Cardinality { name, .. }
            | AggregationSpec::HyperUnique { name, .. } => name,
            AggregationSpec::Filtered { aggregator, .. } => aggregator.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filtered_aggregator_takes_inner_name() {
        let agg = AggregationSpec::Filtered {
            filter: FilterSpec::selector("robot", Some("true".into())),
            aggregator: Box::new(AggregationSpec::Count {
                name: "bot_edits".into(),
            }),
        };
        assert_eq!(agg.name(), "bot_edits");
    }

    #[test]
    fn test_long_sum_wire_shape() {
        let agg = AggregationSpec::LongSum {
            name: "total".into(),
            field_name: "added".into(),
        };
        assert_eq!(
            serde_json::to_value(agg).unwrap(),
            json!({"type": "longSum", "name": "total", "fieldName": "added"})
        );
    }

    #[test]
    fn test_cardinality_wire_shape() {
        let agg = AggregationSpec::Cardinality {
            name: "users".into(),
            fields: vec!["user".into()],
            by_row: false,
        };
        assert_eq!(
            serde_json::to_value(agg).unwrap(),
            json!({"type": "cardinality", "name": "users", "fields": ["user"], "byRow": false})
        );
    }
}
