//! Planner configuration
//!
//! 기본값 → JSON 파일 → 환경 변수 순서로 적용됩니다.

use crate::builder::DEFAULT_ALIAS_PREFIX;
use crate::error::{PlannerError, PlannerResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Comma-separated list of extension modules to load
pub const ENV_MODULES: &str = "OLAPUSH_MODULES";
/// Prefix for synthetic aliases
pub const ENV_ALIAS_PREFIX: &str = "OLAPUSH_ALIAS_PREFIX";
/// Push filters over aggregate outputs as having clauses
pub const ENV_PUSH_HAVING: &str = "OLAPUSH_PUSH_HAVING";
/// Push arithmetic over aggregate outputs as post-aggregations
pub const ENV_PUSH_POST_AGGREGATIONS: &str = "OLAPUSH_PUSH_POST_AGGREGATIONS";

/// 플래너 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Extension modules loaded after the built-in module, in this order
    pub modules: Vec<String>,
    /// Prefix for aliases minted by the builder
    pub alias_prefix: String,
    /// Filters above an aggregate become having clauses
    pub push_having: bool,
    /// Arithmetic over aggregates becomes post-aggregations
    pub push_post_aggregations: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            alias_prefix: DEFAULT_ALIAS_PREFIX.to_string(),
            push_having: true,
            push_post_aggregations: true,
        }
    }
}

impl PlannerConfig {
    /// 기본 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module name
    pub fn with_module(mut self, name: impl Into<String>) -> Self {
        self.modules.push(name.into());
        self
    }

    /// JSON 문자열에서 로드
    pub fn from_json_str(json: &str) -> PlannerResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 파일에서 로드
    pub fn load_from_file(path: impl AsRef<Path>) -> PlannerResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// 파일에 저장
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> PlannerResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 환경 변수 적용
    pub fn apply_env(mut self) -> PlannerResult<Self> {
        if let Ok(value) = env::var(ENV_MODULES) {
            self.modules = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(value) = env::var(ENV_ALIAS_PREFIX) {
            self.alias_prefix = value;
        }
        if let Ok(value) = env::var(ENV_PUSH_HAVING) {
            self.push_having = parse_flag(&value);
        }
        if let Ok(value) = env::var(ENV_PUSH_POST_AGGREGATIONS) {
            self.push_post_aggregations = parse_flag(&value);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the builder cannot work with
    pub fn validate(&self) -> PlannerResult<()> {
        if self.alias_prefix.is_empty() {
            return Err(PlannerError::Config("alias prefix must not be empty".into()));
        }
        if let Some(name) = self.modules.iter().find(|name| name.trim().is_empty()) {
            return Err(PlannerError::Config(format!(
                "blank module name in {:?}",
                name
            )));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    value.to_lowercase() == "true" || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PlannerConfig::new();
        assert!(config.modules.is_empty());
        assert_eq!(config.alias_prefix, "alias");
        assert!(config.push_having);
        assert!(config.push_post_aggregations);
    }

    #[test]
    fn test_config_partial_json() {
        let config = PlannerConfig::from_json_str(r#"{"modules": ["geo", "sketch"]}"#).unwrap();
        assert_eq!(config.modules, vec!["geo", "sketch"]);
        assert_eq!(config.alias_prefix, "alias");
    }

    #[test]
    fn test_config_rejects_empty_prefix() {
        let result = PlannerConfig::from_json_str(r#"{"aliasPrefix": ""}"#);
        assert!(matches!(result, Err(PlannerError::Config(_))));
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("planner.json");

        let config = PlannerConfig::new().with_module("geo");
        config.save_to_file(&path).unwrap();

        let loaded = PlannerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_missing_file() {
        let result = PlannerConfig::load_from_file("target/does-not-exist/planner.json");
        assert!(matches!(result, Err(PlannerError::Io { .. })));
    }

    #[test]
    fn test_config_env_overrides() {
        // 환경 변수 설정 (unsafe)
        unsafe {
            env::set_var(ENV_MODULES, "geo, sketch,,");
            env::set_var(ENV_PUSH_HAVING, "0");
            env::set_var(ENV_PUSH_POST_AGGREGATIONS, "TRUE");
        }

        let config = PlannerConfig::new().apply_env().unwrap();

        unsafe {
            env::remove_var(ENV_MODULES);
            env::remove_var(ENV_PUSH_HAVING);
            env::remove_var(ENV_PUSH_POST_AGGREGATIONS);
        }

        assert_eq!(config.modules, vec!["geo", "sketch"]);
        assert!(!config.push_having);
        assert!(config.push_post_aggregations);
    }
}
