//! Query specification model
//!
//! Closed sum types for every fragment the engine accepts. Each serialises
//! 1:1 into the engine's JSON request shape; list order is preserved so
//! the output is deterministic.

pub mod aggregation;
pub mod dimension;
pub mod filter;
pub mod granularity;
pub mod having;
pub mod limit;
pub mod post_aggregation;
pub mod spec;

pub use aggregation::AggregationSpec;
pub use dimension::{DimensionSpec, ExtractionFunctionSpec};
pub use filter::{BoundOrdering, FilterSpec};
pub use granularity::{GranularitySpec, SimpleGranularity};
pub use having::HavingSpec;
pub use limit::{LimitSpec, OrderByColumnSpec, SortDirection};
pub use post_aggregation::{ArithmeticFn, PostAggregationSpec};
pub use spec::QuerySpec;
