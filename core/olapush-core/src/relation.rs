//! Relation metadata
//!
//! Maps the source relation's column names onto the engine's columns and
//! records the time range the engine holds data for. Builders share one
//! `Arc<RelationInfo>` read-only.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};
use crate::interval::{QueryIntervals, TimeInterval};
use crate::sql::planner::DataType;

/// Role of a column inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    /// The distinguished timestamp column
    Time,
    Dimension,
    Metric,
}

/// Engine-side value type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineType {
    String,
    Long,
    Float,
    Double,
    /// Opaque sketch columns such as `hyperUnique`
    Complex(String),
}

impl EngineType {
    pub fn is_integral(&self) -> bool {
        matches!(self, EngineType::Long)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, EngineType::Long | EngineType::Float | EngineType::Double)
    }
}

/// One engine column as seen by the planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineColumn {
    /// Column name inside the engine
    pub name: String,
    /// Host type of the source column
    pub data_type: DataType,
    pub engine_type: EngineType,
    pub kind: ColumnKind,
}

impl EngineColumn {
    pub fn time(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Timestamp,
            engine_type: EngineType::Long,
            kind: ColumnKind::Time,
        }
    }

    pub fn dimension(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Utf8,
            engine_type: EngineType::String,
            kind: ColumnKind::Dimension,
        }
    }

    pub fn metric(name: impl Into<String>, data_type: DataType, engine_type: EngineType) -> Self {
        Self {
            name: name.into(),
            data_type,
            engine_type,
            kind: ColumnKind::Metric,
        }
    }

    /// With `include_time`, the time column also counts as a dimension.
    pub fn is_dimension(&self, include_time: bool) -> bool {
        match self.kind {
            ColumnKind::Dimension => true,
            ColumnKind::Time => include_time,
            ColumnKind::Metric => false,
        }
    }

    pub fn is_metric(&self) -> bool {
        self.kind == ColumnKind::Metric
    }

    pub fn is_time(&self) -> bool {
        self.kind == ColumnKind::Time
    }
}

/// Metadata for one relation backed by the engine
#[derive(Debug, Clone)]
pub struct RelationInfo {
    name: String,
    data_source: String,
    time_column: String,
    time_ranges: Vec<TimeInterval>,
    source_to_engine: AHashMap<String, EngineColumn>,
}

impl RelationInfo {
    /// `data_source` defaults to the relation name.
    pub fn new(name: impl Into<String>, time_column: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            data_source: name.clone(),
            name,
            time_column: time_column.into(),
            time_ranges: Vec::new(),
            source_to_engine: AHashMap::new(),
        }
    }

    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = data_source.into();
        self
    }

    pub fn with_time_range(mut self, interval: TimeInterval) -> Self {
        self.time_ranges.push(interval);
        self
    }

    /// Maps a source column name onto an engine column.
    pub fn with_column(mut self, source_name: impl Into<String>, column: EngineColumn) -> Self {
        self.source_to_engine.insert(source_name.into(), column);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Engine data source the query is issued against
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /// Source name of the time column
    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn time_ranges(&self) -> &[TimeInterval] {
        &self.time_ranges
    }

    pub fn column(&self, source_name: &str) -> Option<&EngineColumn> {
        self.source_to_engine.get(source_name)
    }

    pub fn contains_column(&self, source_name: &str) -> bool {
        self.source_to_engine.contains_key(source_name)
    }

    /// Source column names, sorted
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.source_to_engine.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Seed intervals for a new builder.
    pub fn query_intervals(&self) -> PlannerResult<QueryIntervals> {
        QueryIntervals::new(self.time_ranges.clone()).ok_or_else(|| self.invalid("no time range"))
    }

    /// Checks the metadata can seed a builder.
    pub fn validate(&self) -> PlannerResult<()> {
        if self.data_source.is_empty() {
            return Err(self.invalid("empty data source name"));
        }
        self.query_intervals()?;
        match self.column(&self.time_column) {
            None => Err(self.invalid(format!(
                "time column '{}' has no engine mapping",
                self.time_column
            ))),
            Some(column) if !column.is_time() => Err(self.invalid(format!(
                "time column '{}' is mapped as {:?}",
                self.time_column, column.kind
            ))),
            Some(_) => Ok(()),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> PlannerError {
        PlannerError::InvalidRelation {
            relation: self.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Supplies relation metadata to the planner
pub trait RelationMetadataProvider: Send + Sync {
    fn relation(&self, name: &str) -> Option<Arc<RelationInfo>>;
}

/// 메모리 기반 카탈로그
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    relations: BTreeMap<String, Arc<RelationInfo>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers the relation under its own name.
    pub fn register(&mut self, relation: RelationInfo) -> PlannerResult<()> {
        relation.validate()?;
        self.relations
            .insert(relation.name().to_string(), Arc::new(relation));
        Ok(())
    }
}

impl RelationMetadataProvider for InMemoryCatalog {
    fn relation(&self, name: &str) -> Option<Arc<RelationInfo>> {
        self.relations.get(name).cloned()
    }
}
