// src/config/ai.rs
//! Language-model collaborator configuration (Azure OpenAI). Supplied by the
//! surrounding application via `config/ai.json` or environment variables; a
//! missing or partial configuration means "service unavailable" and is never
//! an error.

use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use tracing::debug;

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

pub const ENV_AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_AZURE_OPENAI_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";
pub const ENV_AZURE_OPENAI_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

fn default_true() -> bool {
    true
}
fn default_api_version() -> String {
    "2024-02-15-preview".to_string()
}
fn default_daily_limit() -> u32 {
    100
}
fn default_env_sentinel() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Azure OpenAI resource endpoint, e.g. "https://myres.openai.azure.com".
    #[serde(default)]
    pub endpoint: String,
    /// Deployment identifier within the resource (the model alias).
    #[serde(default)]
    pub deployment: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// "ENV" means: read from AZURE_OPENAI_API_KEY.
    #[serde(default = "default_env_sentinel")]
    pub api_key: String,
    /// In-memory per-day request budget for the re-rank stage.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            deployment: String::new(),
            api_version: default_api_version(),
            api_key: String::new(),
            daily_limit: default_daily_limit(),
        }
    }
}

impl AiConfig {
    /// Load order: $AI_CONFIG_PATH, else `config/ai.json`, else environment
    /// variables. Every failure path yields a (possibly incomplete) config
    /// rather than an error; completeness is checked at client build time.
    pub fn load() -> Self {
        let path = env::var(ENV_AI_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.into());
        if Path::new(&path).exists() {
            match Self::load_from_file(&path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(error = ?e, path = %path, "ai config file unreadable; falling back to env");
                }
            }
        } else {
            debug!(path = %path, "no ai config file; reading env");
        }
        Self::from_env()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // Resolve api key if "ENV". A missing variable leaves the key empty,
        // which makes the config incomplete rather than the load fatal.
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = env::var(ENV_AZURE_OPENAI_API_KEY).unwrap_or_default();
        }
        Ok(cfg)
    }

    /// Environment-only configuration; enabled whenever any field is present.
    pub fn from_env() -> Self {
        let endpoint = env::var(ENV_AZURE_OPENAI_ENDPOINT).unwrap_or_default();
        let deployment = env::var(ENV_AZURE_OPENAI_DEPLOYMENT).unwrap_or_default();
        let api_version =
            env::var(ENV_AZURE_OPENAI_API_VERSION).unwrap_or_else(|_| default_api_version());
        let api_key = env::var(ENV_AZURE_OPENAI_API_KEY).unwrap_or_default();
        let enabled = !endpoint.is_empty() || !deployment.is_empty() || !api_key.is_empty();
        Self {
            enabled,
            endpoint,
            deployment,
            api_version,
            api_key,
            daily_limit: default_daily_limit(),
        }
    }

    /// True when the re-rank stage can actually be called.
    pub fn is_complete(&self) -> bool {
        self.enabled
            && !self.endpoint.trim().is_empty()
            && !self.deployment.trim().is_empty()
            && !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_with_all_fields_is_complete() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"enabled": true, "endpoint": "https://r.openai.azure.com", "deployment": "gpt-4o", "api_key": "k-1"}}"#
        )
        .unwrap();
        let cfg = AiConfig::load_from_file(f.path()).unwrap();
        assert!(cfg.is_complete());
        assert_eq!(cfg.api_version, "2024-02-15-preview");
        assert_eq!(cfg.daily_limit, 100);
    }

    #[serial_test::serial]
    #[test]
    fn env_sentinel_resolves_from_environment() {
        std::env::set_var(ENV_AZURE_OPENAI_API_KEY, "resolved-key");
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"endpoint": "https://r.openai.azure.com", "deployment": "gpt-4o", "api_key": "ENV"}}"#
        )
        .unwrap();
        let cfg = AiConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg.api_key, "resolved-key");
        assert!(cfg.is_complete());
        std::env::remove_var(ENV_AZURE_OPENAI_API_KEY);
    }

    #[serial_test::serial]
    #[test]
    fn missing_env_key_means_incomplete_not_error() {
        std::env::remove_var(ENV_AZURE_OPENAI_API_KEY);
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"endpoint": "https://r.openai.azure.com", "deployment": "gpt-4o", "api_key": "ENV"}}"#
        )
        .unwrap();
        let cfg = AiConfig::load_from_file(f.path()).unwrap();
        assert!(cfg.api_key.is_empty());
        assert!(!cfg.is_complete());
    }

    #[serial_test::serial]
    #[test]
    fn env_only_configuration_works() {
        std::env::set_var(ENV_AZURE_OPENAI_ENDPOINT, "https://r.openai.azure.com");
        std::env::set_var(ENV_AZURE_OPENAI_DEPLOYMENT, "gpt-4o");
        std::env::set_var(ENV_AZURE_OPENAI_API_KEY, "k-2");
        let cfg = AiConfig::from_env();
        assert!(cfg.is_complete());
        assert_eq!(cfg.api_version, "2024-02-15-preview");
        std::env::remove_var(ENV_AZURE_OPENAI_ENDPOINT);
        std::env::remove_var(ENV_AZURE_OPENAI_DEPLOYMENT);
        std::env::remove_var(ENV_AZURE_OPENAI_API_KEY);
    }

    #[test]
    fn disabled_flag_blocks_completeness() {
        let cfg = AiConfig {
            enabled: false,
            endpoint: "https://r.openai.azure.com".into(),
            deployment: "gpt-4o".into(),
            api_key: "k".into(),
            ..AiConfig::default()
        };
        assert!(!cfg.is_complete());
    }
}
