//! Having clauses over aggregator outputs

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HavingSpec {
    GreaterThan { aggregation: String, value: f64 },
    LessThan { aggregation: String, value: f64 },
    EqualTo { aggregation: String, value: f64 },
    And { having_specs: Vec<HavingSpec> },
    Or { having_specs: Vec<HavingSpec> },
    Not { having_spec: Box<HavingSpec> },
}

impl HavingSpec {
    /// `left AND right`, flattened into one N-ary node.
    pub fn and(left: HavingSpec, right: HavingSpec) -> Self {
        let mut having_specs = Vec::new();
        for side in [left, right] {
            match side {
                HavingSpec::And { having_specs: inner } => having_specs.extend(inner),
                other => having_specs.push(other),
            }
        }
        HavingSpec::And { having_specs }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(spec: HavingSpec) -> Self {
        HavingSpec::Not {
            having_spec: Box::new(spec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_and_flattens() {
        let gt = HavingSpec::GreaterThan {
            aggregation: "total".into(),
            value: 10.0,
        };
        let lt = HavingSpec::LessThan {
            aggregation: "total".into(),
            value: 100.0,
        };
        let both = HavingSpec::and(HavingSpec::and(gt.clone(), lt.clone()), gt.clone());
        assert_eq!(
            both,
            HavingSpec::And {
                having_specs: vec![gt.clone(), lt, gt]
            }
        );
    }

    #[test]
    fn test_wire_shape() {
        let spec = HavingSpec::not(HavingSpec::EqualTo {
            aggregation: "rows".into(),
            value: 0.0,
        });
        assert_eq!(
            serde_json::to_value(spec).unwrap(),
            json!({
                "type": "not",
                "havingSpec": {"type": "equalTo", "aggregation": "rows", "value": 0.0}
            })
        );
    }
}
