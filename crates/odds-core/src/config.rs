use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

pub const CONFIG_FILE: &str = "config.yaml";
pub const ADMIN_ENDPOINT_VAR: &str = "ODDS_ADMIN_ENDPOINT";
pub const ASK_ENDPOINT_VAR: &str = "ODDS_ASK_ENDPOINT";

fn default_env_name() -> String {
    "production".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub admin_endpoint: Option<String>,
    #[serde(default)]
    pub ask_endpoint: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            admin_endpoint: None,
            ask_endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OddsConfig {
    #[serde(default = "default_env_name")]
    pub default_env: String,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            default_env: default_env_name(),
            environments: BTreeMap::new(),
        }
    }
}

/// One environment with overrides applied and endpoints validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub env: String,
    pub admin_endpoint: Option<String>,
    pub ask_endpoint: Option<String>,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl ResolvedConfig {
    pub fn admin_endpoint(&self) -> Result<&str> {
        self.admin_endpoint.as_deref().ok_or_else(|| {
            anyhow!(
                "no admin_endpoint for environment `{}` (set it in {CONFIG_FILE} or {ADMIN_ENDPOINT_VAR})",
                self.env
            )
        })
    }

    pub fn ask_endpoint(&self) -> Result<&str> {
        self.ask_endpoint.as_deref().ok_or_else(|| {
            anyhow!(
                "no ask_endpoint for environment `{}` (set it in {CONFIG_FILE} or {ASK_ENDPOINT_VAR})",
                self.env
            )
        })
    }
}

/// Expands `${VAR}` placeholders from the process environment.
pub fn resolve_env_var(raw: &str) -> String {
    resolve_placeholders(raw, |key| std::env::var(key).ok())
}

fn resolve_placeholders(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&lookup(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Reads `{root}/config.yaml`. A missing file yields the empty default.
pub fn load_config(root: &Path) -> Result<OddsConfig> {
    let path = config_path(root);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(OddsConfig::default());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}

impl OddsConfig {
    /// Picks `env` (or `default_env`), then applies environment overrides.
    pub fn resolve(&self, env: Option<&str>) -> Result<ResolvedConfig> {
        self.resolve_with(env, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        &self,
        env: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedConfig> {
        let name = env.unwrap_or(&self.default_env);
        let section = match self.environments.get(name) {
            Some(section) => section.clone(),
            None if env.is_some() => {
                return Err(anyhow!("unknown environment `{name}` in {CONFIG_FILE}"));
            }
            None => EnvironmentConfig::default(),
        };

        let pick = |var: &str, configured: Option<String>| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .or_else(|| configured.map(|raw| resolve_placeholders(&raw, &lookup)))
                .map(|value| value.trim().trim_end_matches('/').to_string())
        };

        let resolved = ResolvedConfig {
            env: name.to_string(),
            admin_endpoint: pick(ADMIN_ENDPOINT_VAR, section.admin_endpoint),
            ask_endpoint: pick(ASK_ENDPOINT_VAR, section.ask_endpoint),
            request_timeout: Duration::from_secs(section.request_timeout_secs),
            retry: section.retry,
        };
        validate_config(&resolved)?;
        Ok(resolved)
    }
}

pub fn validate_config(config: &ResolvedConfig) -> Result<()> {
    for (field, value) in [
        ("admin_endpoint", &config.admin_endpoint),
        ("ask_endpoint", &config.ask_endpoint),
    ] {
        let Some(value) = value else {
            continue;
        };
        if value.is_empty() {
            return Err(anyhow!("{field} is empty in environment `{}`", config.env));
        }
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            return Err(anyhow!(
                "{field} must be an http(s) URL, got `{value}` in environment `{}`",
                config.env
            ));
        }
    }
    if config.request_timeout.is_zero() {
        return Err(anyhow!(
            "request_timeout_secs must be positive in environment `{}`",
            config.env
        ));
    }
    if config.retry.max_attempts == 0 {
        return Err(anyhow!(
            "retry.max_attempts must be at least 1 in environment `{}`",
            config.env
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_env: staging
environments:
  staging:
    admin_endpoint: https://admin.staging.example/api/
    ask_endpoint: ${ASK_HOST}/api
    request_timeout_secs: 15
    retry:
      max_attempts: 3
  production:
    admin_endpoint: https://admin.example/api
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_and_resolves_default_env() {
        let config: OddsConfig = serde_yaml::from_str(SAMPLE).unwrap();
        let resolved = config
            .resolve_with(None, |key| {
                (key == "ASK_HOST").then(|| "https://ask.example".to_string())
            })
            .unwrap();
        assert_eq!(resolved.env, "staging");
        assert_eq!(
            resolved.admin_endpoint.as_deref(),
            Some("https://admin.staging.example/api")
        );
        assert_eq!(resolved.ask_endpoint.as_deref(), Some("https://ask.example/api"));
        assert_eq!(resolved.request_timeout, Duration::from_secs(15));
        assert_eq!(resolved.retry.max_attempts, 3);
    }

    #[test]
    fn environment_variables_override_file() {
        let config: OddsConfig = serde_yaml::from_str(SAMPLE).unwrap();
        let resolved = config
            .resolve_with(Some("production"), |key| {
                (key == ADMIN_ENDPOINT_VAR).then(|| "http://localhost:8000".to_string())
            })
            .unwrap();
        assert_eq!(resolved.admin_endpoint.as_deref(), Some("http://localhost:8000"));
        assert!(resolved.ask_endpoint().is_err());
        assert_eq!(resolved.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn unknown_explicit_env_is_an_error() {
        let config: OddsConfig = serde_yaml::from_str(SAMPLE).unwrap();
        let err = config.resolve_with(Some("qa"), no_env).unwrap_err();
        assert!(err.to_string().contains("unknown environment"));
    }

    #[test]
    fn rejects_non_http_endpoints() {
        let config: OddsConfig = serde_yaml::from_str(
            "environments:\n  production:\n    admin_endpoint: ftp://nope\n",
        )
        .unwrap();
        let err = config.resolve_with(None, no_env).unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = load_config(temp.path()).unwrap();
        assert_eq!(config, OddsConfig::default());
        let resolved = config.resolve_with(None, no_env).unwrap();
        assert!(resolved.admin_endpoint.is_none());
    }

    #[test]
    fn loads_from_disk() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(config_path(temp.path()), SAMPLE).unwrap();
        let config = load_config(temp.path()).unwrap();
        assert_eq!(config.default_env, "staging");
        assert_eq!(config.environments.len(), 2);
    }

    #[test]
    fn placeholder_resolution() {
        let lookup = |key: &str| (key == "A").then(|| "x".to_string());
        assert_eq!(resolve_placeholders("${A}-${B}", lookup), "x-");
        assert_eq!(resolve_placeholders("${A", lookup), "${A");
        assert_eq!(resolve_placeholders("", lookup), "");
    }
}
