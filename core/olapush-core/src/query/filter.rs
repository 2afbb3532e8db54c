//! Filter fragments

use serde::Serialize;

/// How a bound filter compares values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundOrdering {
    Lexicographic,
    Numeric,
}

/// A row filter the engine evaluates natively
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FilterSpec {
    /// `dimension = value`; a `None` value matches nulls
    Selector {
        dimension: String,
        value: Option<String>,
    },
    /// Range comparison, either side optional
    Bound {
        dimension: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lower: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        upper: Option<String>,
        lower_strict: bool,
        upper_strict: bool,
        ordering: BoundOrdering,
    },
    In {
        dimension: String,
        values: Vec<String>,
    },
    Regex {
        dimension: String,
        pattern: String,
    },
    And {
        fields: Vec<FilterSpec>,
    },
    Or {
        fields: Vec<FilterSpec>,
    },
    Not {
        field: Box<FilterSpec>,
    },
}

impl FilterSpec {
    pub fn selector(dimension: impl Into<String>, value: Option<String>) -> Self {
        FilterSpec::Selector {
            dimension: dimension.into(),
            value,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(field: FilterSpec) -> Self {
        match field {
            FilterSpec::Not { field } => *field,
            other => FilterSpec::Not {
                field: Box::new(other),
            },
        }
    }

    /// `left AND right`, flattened into one N-ary node.
    pub fn and(left: FilterSpec, right: FilterSpec) -> Self {
        let mut fields = Vec::new();
        for side in [left, right] {
            match side {
                FilterSpec::And { fields: inner } => fields.extend(inner),
                other => fields.push(other),
            }
        }
        FilterSpec::And { fields }
    }

    /// `left OR right`, flattened into one N-ary node.
    pub fn or(left: FilterSpec, right: FilterSpec) -> Self {
        let mut fields = Vec::new();
        for side in [left, right] {
            match side {
                FilterSpec::Or { fields: inner } => fields.extend(inner),
                other => fields.push(other),
            }
        }
        FilterSpec::Or { fields }
    }

    /// Dimensions the filter reads
    pub fn dimensions(&self) -> Vec<&str> {
        match self {
            FilterSpec::Selector { dimension, .. }
            | FilterSpec::Bound { dimension, .. }
            | FilterSpec::In { dimension, .. }
            | FilterSpec::Regex { dimension, .. } => vec![dimension],
            FilterSpec::And { fields } | FilterSpec::Or { fields } => {
                fields.iter().flat_map(FilterSpec::dimensions).collect()
            }
            FilterSpec::Not { field } => field.dimensions(),
        }
    }
}
