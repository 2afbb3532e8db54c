//! Error types for the olapush planner.
//!
//! Only configuration and metadata problems are errors. An unsatisfiable
//! plan branch is `None`, an unrepresentable fragment is an unpushed flag
//! on the builder.

use thiserror::Error;

/// Unified error type for all planner operations.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The metadata provider has no relation under this name
    #[error("relation '{0}' not found")]
    RelationNotFound(String),

    /// Relation metadata exists but cannot seed a builder
    #[error("invalid relation '{relation}': {reason}")]
    InvalidRelation { relation: String, reason: String },

    /// A configured extension module was never registered
    #[error("module '{0}' is not registered")]
    ModuleNotRegistered(String),

    /// Two modules registered under the same name
    #[error("module '{0}' already registered")]
    DuplicateModule(String),

    /// Malformed configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// The driver met an operator it cannot fold at all
    #[error("unsupported plan operator {operator}: {reason}")]
    UnsupportedPlan { operator: String, reason: String },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Lock poisoned
    #[error("lock poisoned")]
    LockPoisoned,
}

/// Result type alias for all planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_relation_not_found() {
        let err = PlannerError::RelationNotFound("wikipedia".to_string());
        assert_eq!(err.to_string(), "relation 'wikipedia' not found");
    }

    #[test]
    fn error_display_invalid_relation() {
        let err = PlannerError::InvalidRelation {
            relation: "sales".to_string(),
            reason: "empty time range".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid relation 'sales': empty time range"
        );
    }

    #[test]
    fn error_display_module_not_registered() {
        let err = PlannerError::ModuleNotRegistered("geo".to_string());
        assert!(err.to_string().contains("'geo'"));
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn error_from_serde_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: PlannerError = parse.unwrap_err().into();
        assert!(matches!(err, PlannerError::Serialization(_)));
    }

    #[test]
    fn error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PlannerError = io.into();
        assert!(err.to_string().starts_with("io error"));
    }

    #[test]
    fn planner_result_err() {
        let result: PlannerResult<i32> = Err(PlannerError::LockPoisoned);
        assert!(result.is_err());
    }
}
