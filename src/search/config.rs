// src/search/config.rs
//! Search collaborator configuration: optional TOML file, environment
//! overrides win. A missing or incomplete configuration is not an error —
//! calls degrade to zero results with a warning at request time.

use std::path::Path;
use std::{env, fs};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_SEARCH_CONFIG_PATH: &str = "config/search.toml";
pub const ENV_SEARCH_CONFIG_PATH: &str = "SEARCH_CONFIG_PATH";

pub const ENV_SERP_API_KEY: &str = "SERP_API_KEY";
pub const ENV_SERP_ENDPOINT: &str = "SERP_ENDPOINT";
pub const ENV_SEARCH_NUM_RESULTS: &str = "SEARCH_NUM_RESULTS";
pub const ENV_SEARCH_GL: &str = "SEARCH_GL";
pub const ENV_SEARCH_HL: &str = "SEARCH_HL";
pub const ENV_SEARCH_TIMEOUT_SECS: &str = "SEARCH_TIMEOUT_SECS";

pub const DEFAULT_SERP_ENDPOINT: &str = "https://serpapi.com/search";
pub const DEFAULT_NUM_RESULTS: usize = 20;
/// Page-size cap accepted by the search service.
pub const MAX_NUM_RESULTS: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Usually left empty in the file and supplied via SERP_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    #[serde(default = "default_gl")]
    pub gl: String,
    #[serde(default = "default_hl")]
    pub hl: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_SERP_ENDPOINT.to_string()
}
fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}
fn default_gl() -> String {
    "us".to_string()
}
fn default_hl() -> String {
    "en".to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            num_results: default_num_results(),
            gl: default_gl(),
            hl: default_hl(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl SearchConfig {
    /// Load order: $SEARCH_CONFIG_PATH, else `config/search.toml`, else
    /// built-in defaults; then environment overrides on top; then clamp.
    pub fn load() -> Self {
        let path =
            env::var(ENV_SEARCH_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_SEARCH_CONFIG_PATH.into());
        let mut cfg = match Self::load_from_file(Path::new(&path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                debug!(error = ?e, path = %path, "search config file not loaded; using defaults");
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        cfg.num_results = cfg.num_results.clamp(1, MAX_NUM_RESULTS);
        cfg
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading search config from {}", path.display()))?;
        toml::from_str(&content).context("parsing search config toml")
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_nonempty(ENV_SERP_ENDPOINT) {
            self.endpoint = v;
        }
        if let Some(v) = env_nonempty(ENV_SERP_API_KEY) {
            self.api_key = v;
        }
        if let Some(v) = env_nonempty(ENV_SEARCH_GL) {
            self.gl = v;
        }
        if let Some(v) = env_nonempty(ENV_SEARCH_HL) {
            self.hl = v;
        }
        if let Some(n) = env_nonempty(ENV_SEARCH_NUM_RESULTS).and_then(|v| v.parse().ok()) {
            self.num_results = n;
        }
        if let Some(n) = env_nonempty(ENV_SEARCH_TIMEOUT_SECS).and_then(|v| v.parse().ok()) {
            self.timeout_secs = n;
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
