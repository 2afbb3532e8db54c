//! Time bucketing

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Named bucket sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleGranularity {
    Second,
    Minute,
    FifteenMinute,
    ThirtyMinute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl SimpleGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleGranularity::Second => "second",
            SimpleGranularity::Minute => "minute",
            SimpleGranularity::FifteenMinute => "fifteen_minute",
            SimpleGranularity::ThirtyMinute => "thirty_minute",
            SimpleGranularity::Hour => "hour",
            SimpleGranularity::Day => "day",
            SimpleGranularity::Week => "week",
            SimpleGranularity::Month => "month",
            SimpleGranularity::Quarter => "quarter",
            SimpleGranularity::Year => "year",
        }
    }

    /// Parses a `date_trunc` unit, case-insensitively.
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit.to_lowercase().as_str() {
            "second" => Some(SimpleGranularity::Second),
            "minute" => Some(SimpleGranularity::Minute),
            "fifteen_minute" => Some(SimpleGranularity::FifteenMinute),
            "thirty_minute" => Some(SimpleGranularity::ThirtyMinute),
            "hour" => Some(SimpleGranularity::Hour),
            "day" => Some(SimpleGranularity::Day),
            "week" => Some(SimpleGranularity::Week),
            "month" => Some(SimpleGranularity::Month),
            "quarter" => Some(SimpleGranularity::Quarter),
            "year" => Some(SimpleGranularity::Year),
            _ => None,
        }
    }
}

/// Query granularity; `All` puts every row into a single bucket.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GranularitySpec {
    #[default]
    All,
    /// Engine's native ingestion granularity
    None,
    Simple(SimpleGranularity),
    Duration {
        millis: i64,
        origin: Option<DateTime<Utc>>,
    },
    Period {
        /// ISO-8601 period such as `P1D`
        period: String,
        time_zone: Option<String>,
        origin: Option<DateTime<Utc>>,
    },
}

impl GranularitySpec {
    pub fn is_all(&self) -> bool {
        matches!(self, GranularitySpec::All)
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum DetailedGranularity<'a> {
    Duration {
        duration: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin: Option<&'a DateTime<Utc>>,
    },
    Period {
        period: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        time_zone: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin: Option<&'a DateTime<Utc>>,
    },
}

impl Serialize for GranularitySpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GranularitySpec::All => serializer.serialize_str("all"),
            GranularitySpec::None => serializer.serialize_str("none"),
            GranularitySpec::Simple(simple) => serializer.serialize_str(simple.as_str()),
            GranularitySpec::Duration { millis, origin } => DetailedGranularity::Duration {
                duration: *millis,
                origin: origin.as_ref(),
            }
            .serialize(serializer),
            GranularitySpec::Period {
                period,
                time_zone,
                origin,
            } => DetailedGranularity::Period {
                period,
                time_zone: time_zone.as_deref(),
                origin: origin.as_ref(),
            }
            .serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_all() {
        assert!(GranularitySpec::default().is_all());
        assert_eq!(serde_json::to_value(GranularitySpec::All).unwrap(), json!("all"));
    }

    #[test]
    fn test_simple_round_trips_unit() {
        let g = SimpleGranularity::from_unit("DAY").unwrap();
        assert_eq!(
            serde_json::to_value(GranularitySpec::Simple(g)).unwrap(),
            json!("day")
        );
        assert!(SimpleGranularity::from_unit("fortnight").is_none());
    }

    #[test]
    fn test_period_wire_shape() {
        let g = GranularitySpec::Period {
            period: "P1D".into(),
            time_zone: Some("America/Los_Angeles".into()),
            origin: None,
        };
        assert_eq!(
            serde_json::to_value(g).unwrap(),
            json!({"type": "period", "period": "P1D", "timeZone": "America/Los_Angeles"})
        );
    }

    #[test]
    fn test_duration_wire_shape() {
        let g = GranularitySpec::Duration {
            millis: 7_200_000,
            origin: None,
        };
        assert_eq!(
            serde_json::to_value(g).unwrap(),
            json!({"type": "duration", "duration": 7_200_000})
        );
    }
}
