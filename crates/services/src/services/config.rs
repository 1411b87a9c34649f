use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// What the drag engine does with its optimistic snapshot when a bulk write fails.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, TS, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MoveFailurePolicy {
    /// Reload the board's lists from the store.
    #[default]
    Resync,
    /// Put back the snapshot from before the move, unless a later move already replaced it.
    Revert,
}

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

fn default_session_ttl_hours() -> i64 {
    DEFAULT_SESSION_TTL_HOURS
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_password_min_length() -> usize {
    6
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq)]
pub struct Config {
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Where unauthenticated browser requests are redirected.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
    #[serde(default)]
    pub move_failure_policy: MoveFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            login_path: default_login_path(),
            password_min_length: default_password_min_length(),
            move_failure_policy: MoveFailurePolicy::default(),
        }
    }
}

/// Overrides `move_failure_policy` from the file, e.g. `revert`.
pub const MOVE_FAILURE_POLICY_ENV: &str = "TASKFLOW_MOVE_FAILURE_POLICY";

impl Config {
    /// Apply environment overrides on top of the file's values.
    pub fn with_env_overrides(self) -> Self {
        let raw = std::env::var(MOVE_FAILURE_POLICY_ENV).ok();
        self.with_policy_override(raw.as_deref())
    }

    fn with_policy_override(mut self, raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return self;
        };
        match raw.trim().parse::<MoveFailurePolicy>() {
            Ok(policy) => self.move_failure_policy = policy,
            Err(e) => {
                let e: strum::ParseError = e;
                tracing::warn!(
                    value = raw,
                    error = %e,
                    "Ignoring {}, keeping {}",
                    MOVE_FAILURE_POLICY_ENV,
                    self.move_failure_policy
                );
            }
        }
        self
    }
}

impl From<String> for Config {
    fn from(raw_config: String) -> Self {
        match serde_json::from_str::<Config>(&raw_config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Config file is invalid: {}, using default", e);
                Self::default()
            }
        }
    }
}

/// Will always return config, falling back to the default when the file is missing or invalid.
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Config::from(raw_config),
        Err(_) => {
            tracing::info!("No config file found, creating one");
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let raw_config = serde_json::to_string_pretty(config)?;
    tokio::fs::write(config_path, raw_config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config = Config::from(r#"{"move_failure_policy":"revert"}"#.to_string());
        assert_eq!(config.move_failure_policy, MoveFailurePolicy::Revert);
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.password_min_length, 6);
    }

    #[test]
    fn invalid_config_falls_back_to_default() {
        assert_eq!(Config::from("not json".to_string()), Config::default());
    }

    #[test]
    fn policy_parses_from_snake_case() {
        assert_eq!(
            MoveFailurePolicy::from_str("resync").unwrap(),
            MoveFailurePolicy::Resync
        );
        assert_eq!(MoveFailurePolicy::Revert.to_string(), "revert");
    }

    #[test]
    fn policy_override_from_env_value() {
        let config = Config::default().with_policy_override(Some(" revert "));
        assert_eq!(config.move_failure_policy, MoveFailurePolicy::Revert);

        let config = config.with_policy_override(Some("retry-forever"));
        assert_eq!(config.move_failure_policy, MoveFailurePolicy::Revert);

        let config = Config::default().with_policy_override(None);
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        assert_eq!(load_config_from_file(&path).await, Config::default());

        let config = Config {
            session_ttl_hours: 1,
            ..Config::default()
        };
        save_config_to_file(&config, &path).await.unwrap();
        assert_eq!(load_config_from_file(&path).await, config);
    }
}
