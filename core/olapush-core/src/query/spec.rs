//! Complete query requests

use serde::Serialize;

use super::{
    AggregationSpec, DimensionSpec, FilterSpec, GranularitySpec, HavingSpec, LimitSpec,
    PostAggregationSpec,
};
use crate::interval::QueryIntervals;

/// A request the engine executes natively
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "queryType",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum QuerySpec {
    /// Grouped aggregation
    GroupBy {
        data_source: String,
        dimensions: Vec<DimensionSpec>,
        granularity: GranularitySpec,
        #[serde(skip_serializing_if = "Option::is_none")]
        filter: Option<FilterSpec>,
        aggregations: Vec<AggregationSpec>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        post_aggregations: Vec<PostAggregationSpec>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit_spec: Option<LimitSpec>,
        #[serde(skip_serializing_if = "Option::is_none")]
        having: Option<HavingSpec>,
        intervals: QueryIntervals,
    },
    /// Aggregation over time buckets only
    Timeseries {
        data_source: String,
        granularity: GranularitySpec,
        #[serde(skip_serializing_if = "Option::is_none")]
        filter: Option<FilterSpec>,
        aggregations: Vec<AggregationSpec>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        post_aggregations: Vec<PostAggregationSpec>,
        intervals: QueryIntervals,
    },
    /// Raw rows, no aggregation
    Scan {
        data_source: String,
        columns: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        filter: Option<FilterSpec>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
        intervals: QueryIntervals,
    },
}

impl QuerySpec {
    pub fn query_type(&self) -> &'static str {
        match self {
            QuerySpec::GroupBy { .. } => "groupBy",
            QuerySpec::Timeseries { .. } => "timeseries",
            QuerySpec::Scan { .. } => "scan",
        }
    }

    pub fn intervals(&self) -> &QueryIntervals {
        match self {
            QuerySpec::GroupBy { intervals, .. }
            | QuerySpec::Timeseries { intervals, .. }
            | QuerySpec::Scan { intervals, .. } => intervals,
        }
    }

    /// JSON request body
    pub fn to_json(&self) -> crate::error::PlannerResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
