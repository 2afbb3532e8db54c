//! Query interval algebra
//!
//! A relation's known time range is a sorted list of disjoint half-open
//! intervals `[start, end)`. Every time predicate pushed into a query
//! narrows that list. Narrowing to nothing is not an error: it returns
//! `None`, meaning the plan branch can never match any row.

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// One half-open interval `[start, end)`, never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// `None` unless `start < end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Interval between two epoch-millisecond instants
    pub fn from_millis(start: i64, end: i64) -> Option<Self> {
        Self::new(
            DateTime::from_timestamp_millis(start)?,
            DateTime::from_timestamp_millis(end)?,
        )
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn intersect(&self, other: &TimeInterval) -> Option<TimeInterval> {
        TimeInterval::new(self.start.max(other.start), self.end.min(other.end))
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

impl Serialize for TimeInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Comparison of the time column against an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalConditionKind {
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// `time <kind> at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalCondition {
    pub kind: IntervalConditionKind,
    pub at: DateTime<Utc>,
}

impl IntervalCondition {
    pub fn new(kind: IntervalConditionKind, at: DateTime<Utc>) -> Self {
        Self { kind, at }
    }
}

/// Sorted, disjoint, non-empty list of intervals the query may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIntervals {
    intervals: Vec<TimeInterval>,
}

impl QueryIntervals {
    /// Normalises `intervals`: sorts them and merges overlapping or
    /// touching neighbours. `None` when the list is empty.
    pub fn new(mut intervals: Vec<TimeInterval>) -> Option<Self> {
        intervals.sort();
        let mut merged: Vec<TimeInterval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match merged.last_mut() {
                Some(last) if interval.start <= last.end => {
                    last.end = last.end.max(interval.end);
                }
                _ => merged.push(interval),
            }
        }
        (!merged.is_empty()).then_some(Self { intervals: merged })
    }

    pub fn single(interval: TimeInterval) -> Self {
        Self {
            intervals: vec![interval],
        }
    }

    pub fn intervals(&self) -> &[TimeInterval] {
        &self.intervals
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.intervals.iter().any(|interval| interval.contains(at))
    }

    /// `time < at`
    pub fn before(&self, at: DateTime<Utc>) -> Option<Self> {
        self.clip(DateTime::<Utc>::MIN_UTC, at)
    }

    /// `time <= at`
    pub fn before_or_equal(&self, at: DateTime<Utc>) -> Option<Self> {
        match next_instant(at) {
            Some(end) => self.clip(DateTime::<Utc>::MIN_UTC, end),
            // nothing lies after the maximum instant
            None => Some(self.clone()),
        }
    }

    /// `time > at`
    pub fn after(&self, at: DateTime<Utc>) -> Option<Self> {
        self.clip(next_instant(at)?, DateTime::<Utc>::MAX_UTC)
    }

    /// `time >= at`
    pub fn after_or_equal(&self, at: DateTime<Utc>) -> Option<Self> {
        if at == DateTime::<Utc>::MAX_UTC {
            return None;
        }
        self.clip(at, DateTime::<Utc>::MAX_UTC)
    }

    /// Dispatches on the condition kind.
    pub fn restrict(&self, condition: IntervalCondition) -> Option<Self> {
        match condition.kind {
            IntervalConditionKind::Lt => self.before(condition.at),
            IntervalConditionKind::LtEq => self.before_or_equal(condition.at),
            IntervalConditionKind::Gt => self.after(condition.at),
            IntervalConditionKind::GtEq => self.after_or_equal(condition.at),
        }
    }

    fn clip(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        let bound = TimeInterval::new(start, end)?;
        let intervals: Vec<TimeInterval> = self
            .intervals
            .iter()
            .filter_map(|interval| interval.intersect(&bound))
            .collect();
        (!intervals.is_empty()).then_some(Self { intervals })
    }
}

impl fmt::Display for QueryIntervals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", interval)?;
        }
        Ok(())
    }
}

impl Serialize for QueryIntervals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.intervals.serialize(serializer)
    }
}

/// Instants are millisecond-granular; the next one after `at`.
fn next_instant(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    at.checked_add_signed(Duration::milliseconds(1))
}
