//! Configuration file handling

use serde::Deserialize;
use std::path::Path;

use super::paths::config_path;
use super::Result;

/// Environment variables seeded into scenario memory when nothing else is configured
pub const DEFAULT_SEEDED_KEYS: &str =
    "HTTP_ENDPOINT,GRAPHQL_ENDPOINT,RESET_ENDPOINT,RESET_METHOD,RESET_BODY";

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Seeded memory settings
    #[serde(default)]
    pub seed: SeedConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Scenario runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Which environment variables become default memory entries
#[derive(Debug, Deserialize)]
pub struct SeedConfig {
    /// Allow-list of environment variable names
    #[serde(default = "default_seed_keys")]
    pub keys: Vec<String>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            keys: default_seed_keys(),
        }
    }
}

fn default_seed_keys() -> Vec<String> {
    parse_key_list(DEFAULT_SEEDED_KEYS)
}

/// HTTP client settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("apiprobe/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Scenario runner settings
#[derive(Debug, Deserialize, Default)]
pub struct RunnerConfig {
    /// Stop the run after the first failed scenario
    #[serde(default)]
    pub fail_fast: bool,
}

/// Split a comma separated key list, dropping blanks
pub fn parse_key_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.seed.keys.len(), 5);
        assert_eq!(config.seed.keys[0], "HTTP_ENDPOINT");
        assert_eq!(config.http.timeout_secs, 30);
        assert!(!config.runner.fail_fast);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
[seed]
keys = ["API_URL", "TOKEN"]

[runner]
fail_fast = true
"#,
        )
        .unwrap();
        assert_eq!(config.seed.keys, vec!["API_URL", "TOKEN"]);
        assert!(config.runner.fail_fast);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_toml_is_config_parse_error() {
        let err = Config::parse("[seed\nkeys = 1").unwrap_err();
        assert!(matches!(err, super::super::Error::ConfigParse(_)));
    }

    #[test]
    fn test_parse_key_list() {
        assert_eq!(parse_key_list(" A, B ,,C"), vec!["A", "B", "C"]);
        assert!(parse_key_list("").is_empty());
    }
}
