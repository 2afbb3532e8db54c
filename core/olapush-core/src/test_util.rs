//! Shared fixtures for unit tests

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::interval::TimeInterval;
use crate::relation::{EngineColumn, EngineType, InMemoryCatalog, RelationInfo};
use crate::sql::planner::DataType;

pub(crate) fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// `wikipedia` relation holding January 2020
pub(crate) fn wikipedia() -> RelationInfo {
    RelationInfo::new("wikipedia", "ts")
        .with_data_source("wiki_edits")
        .with_time_range(TimeInterval::new(day(2020, 1, 1), day(2020, 2, 1)).unwrap())
        .with_column("ts", EngineColumn::time("__time"))
        .with_column("page", EngineColumn::dimension("page"))
        .with_column("country", EngineColumn::dimension("countryName"))
        .with_column(
            "added",
            EngineColumn::metric("added", DataType::Int64, EngineType::Long),
        )
        .with_column(
            "delta",
            EngineColumn::metric("delta", DataType::Float64, EngineType::Double),
        )
}

pub(crate) fn wikipedia_arc() -> Arc<RelationInfo> {
    Arc::new(wikipedia())
}

pub(crate) fn catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    catalog.register(wikipedia()).unwrap();
    catalog
}
