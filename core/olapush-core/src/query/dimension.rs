//! Grouping dimensions

use serde::Serialize;

/// Transform applied to dimension values before grouping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExtractionFunctionSpec {
    TimeFormat {
        format: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        time_zone: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        locale: Option<String>,
    },
    Substring {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
    },
    Regex {
        expr: String,
    },
    Upper {},
    Lower {},
}

/// One grouping key. Order within a query is the result row key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DimensionSpec {
    Default {
        dimension: String,
        output_name: String,
    },
    Extraction {
        dimension: String,
        output_name: String,
        extraction_fn: ExtractionFunctionSpec,
    },
}

impl DimensionSpec {
    pub fn column(dimension: impl Into<String>, output_name: impl Into<String>) -> Self {
        DimensionSpec::Default {
            dimension: dimension.into(),
            output_name: output_name.into(),
        }
    }

    /// Engine column grouped on
    pub fn dimension(&self) -> &str {
        match self {
            DimensionSpec::Default { dimension, .. } | DimensionSpec::Extraction { dimension, .. } => {
                dimension
            }
        }
    }

    /// Name of the key in result rows
    pub fn output_name(&self) -> &str {
        match self {
            DimensionSpec::Default { output_name, .. }
            | DimensionSpec::Extraction { output_name, .. } => output_name,
        }
    }
}
