use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8081/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("Cannot locate a home directory; set CLAIMS_TOKEN_FILE")]
    NoTokenLocation,
}

/// Runtime settings for the portal client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    /// Base of the REST surface, including the `/api` prefix.
    pub api_base_url: String,
    /// File holding the persisted bearer token.
    pub token_path: PathBuf,
    /// Transport timeout; no other timeout or retry is applied.
    pub request_timeout: Duration,
}

impl PortalConfig {
    /// Reads `CLAIMS_API_URL`, `CLAIMS_TOKEN_FILE` and
    /// `CLAIMS_HTTP_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = match lookup("CLAIMS_API_URL") {
            Some(url) => normalize_base_url("CLAIMS_API_URL", &url)?,
            None => DEFAULT_API_URL.to_string(),
        };

        let token_path = match lookup("CLAIMS_TOKEN_FILE").filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => lookup("HOME")
                .or_else(|| lookup("USERPROFILE"))
                .filter(|home| !home.is_empty())
                .map(|home| PathBuf::from(home).join(".claims-portal").join("session.json"))
                .ok_or(ConfigError::NoTokenLocation)?,
        };

        let request_timeout = match lookup("CLAIMS_HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_timeout("CLAIMS_HTTP_TIMEOUT_SECS", &raw)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url,
            token_path,
            request_timeout,
        })
    }

    pub fn with_api_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url("--api-url", url)?;
        Ok(self)
    }
}

fn normalize_base_url(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(ConfigError::InvalidUrl {
            var,
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_timeout(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_from_home() {
        let config = PortalConfig::from_lookup(lookup(&[("HOME", "/home/john")])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(
            config.token_path,
            PathBuf::from("/home/john/.claims-portal/session.json")
        );
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn explicit_values_are_normalized() {
        let config = PortalConfig::from_lookup(lookup(&[
            ("CLAIMS_API_URL", "https://claims.example.com/api/"),
            ("CLAIMS_TOKEN_FILE", "/tmp/token.json"),
            ("CLAIMS_HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://claims.example.com/api");
        assert_eq!(config.token_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            PortalConfig::from_lookup(lookup(&[("HOME", "/h"), ("CLAIMS_API_URL", "localhost:8081")])),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            PortalConfig::from_lookup(lookup(&[("HOME", "/h"), ("CLAIMS_HTTP_TIMEOUT_SECS", "0")])),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert_eq!(
            PortalConfig::from_lookup(lookup(&[])),
            Err(ConfigError::NoTokenLocation)
        );
    }
}
