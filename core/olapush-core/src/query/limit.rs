//! Ordering and row limit

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderByColumnSpec {
    /// Dimension output name or aggregator name
    pub dimension: String,
    pub direction: SortDirection,
}

impl OrderByColumnSpec {
    pub fn new(dimension: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            dimension: dimension.into(),
            direction,
        }
    }
}

/// Ordering plus row limit of a group-by query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "default")]
pub struct LimitSpec {
    pub limit: usize,
    pub columns: Vec<OrderByColumnSpec>,
}

impl LimitSpec {
    /// Placeholder row limit of an ordering that has no limit yet
    pub const UNBOUNDED: usize = i32::MAX as usize;

    pub fn new(limit: usize, columns: Vec<OrderByColumnSpec>) -> Self {
        Self { limit, columns }
    }

    /// Ordering only; the limit is fixed later.
    pub fn ordering(columns: Vec<OrderByColumnSpec>) -> Self {
        Self::new(Self::UNBOUNDED, columns)
    }

    pub fn is_bounded(&self) -> bool {
        self.limit != Self::UNBOUNDED
    }

    /// Reconciles another limit request with this one.
    ///
    /// An unbounded side adopts the other's limit; two bounded limits must
    /// agree exactly. Ordering columns accumulate, skipping dimensions
    /// already ordered on. `None` when the limits conflict.
    pub fn merge(&self, other: &LimitSpec) -> Option<LimitSpec> {
        let limit = match (self.is_bounded(), other.is_bounded()) {
            (false, _) => other.limit,
            (true, false) => self.limit,
            (true, true) if self.limit == other.limit => self.limit,
            (true, true) => return None,
        };
        let mut columns = self.columns.clone();
        for column in &other.columns {
            if !columns.iter().any(|c| c.dimension == column.dimension) {
                columns.push(column.clone());
            }
        }
        Some(LimitSpec { limit, columns })
    }
}
