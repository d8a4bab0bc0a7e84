//! Service configuration loaded from environment variables

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use directories::ProjectDirs;
use thiserror::Error;

use crate::upstream::{RecentTracksQuery, DEFAULT_LIMIT, DEFAULT_USER, LASTFM_API_URL};

/// Port the frontend dev server proxies `/lastfm.php` to
pub const DEFAULT_PORT: u16 = 4444;

/// Default freshness window in seconds
pub const DEFAULT_CACHE_DURATION_SECS: u64 = 30;

/// Longest freshness window honoured; larger values are clamped
pub const MAX_CACHE_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

pub const API_KEY_VAR: &str = "LASTFM_API_KEY";
pub const SHARED_SECRET_VAR: &str = "LASTFM_SHARED_SECRET";

/// Errors raised while loading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables are unset or empty
    #[error("Missing required environment variables: {}.", .0.join(", "))]
    MissingVars(Vec<&'static str>),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Last.fm API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    /// Required to be present, but `user.getrecenttracks` is unsigned so it is never sent
    pub shared_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("shared_secret", &"<redacted>")
            .finish()
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Last.fm user whose recent tracks are proxied
    pub user: String,
    /// Number of recent tracks requested
    pub limit: u32,
    /// Upstream base URL
    pub api_url: String,
    /// Freshness window in seconds
    pub cache_duration_secs: u64,
    /// Directory holding the cache slot files
    pub cache_dir: PathBuf,
    /// Port to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Both credentials are checked before anything else so that a single error
    /// names every missing one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = non_empty(API_KEY_VAR);
        let shared_secret = non_empty(SHARED_SECRET_VAR);
        let credentials = match (api_key, shared_secret) {
            (Some(api_key), Some(shared_secret)) => Credentials {
                api_key,
                shared_secret,
            },
            (api_key, shared_secret) => {
                let mut missing = Vec::new();
                if api_key.is_none() {
                    missing.push(API_KEY_VAR);
                }
                if shared_secret.is_none() {
                    missing.push(SHARED_SECRET_VAR);
                }
                return Err(ConfigError::MissingVars(missing));
            }
        };

        let limit: u32 = parse_var(&non_empty, "LASTFM_LIMIT", DEFAULT_LIMIT)?;
        if limit == 0 {
            return Err(ConfigError::Invalid {
                var: "LASTFM_LIMIT",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            credentials,
            user: non_empty("LASTFM_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            limit,
            api_url: non_empty("LASTFM_API_URL").unwrap_or_else(|| LASTFM_API_URL.to_string()),
            cache_duration_secs: parse_var(
                &non_empty,
                "CACHE_DURATION",
                DEFAULT_CACHE_DURATION_SECS,
            )?,
            cache_dir: non_empty("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_dir),
            port: parse_var(&non_empty, "PORT", DEFAULT_PORT)?,
        })
    }

    /// The fixed upstream query this service proxies
    pub fn query(&self) -> RecentTracksQuery {
        RecentTracksQuery::new(self.user.clone(), self.limit)
    }

    /// Freshness window
    pub fn cache_duration(&self) -> Duration {
        let secs = self.cache_duration_secs.min(MAX_CACHE_DURATION_SECS);
        Duration::seconds(secs as i64)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// XDG cache directory (`~/.cache/nowplaying/` on Linux), or `./.cache`
fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "nowplaying")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./.cache"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    const CREDS: [(&str, &str); 2] = [(API_KEY_VAR, "key"), (SHARED_SECRET_VAR, "secret")];

    #[test]
    fn test_defaults_with_credentials_only() {
        let config = load(&CREDS).unwrap();

        assert_eq!(config.credentials.api_key, "key");
        assert_eq!(config.credentials.shared_secret, "secret");
        assert_eq!(config.user, "misaliba");
        assert_eq!(config.limit, 1);
        assert_eq!(config.api_url, LASTFM_API_URL);
        assert_eq!(config.cache_duration_secs, 30);
        assert_eq!(config.cache_duration(), Duration::seconds(30));
        assert_eq!(config.port, 4444);
    }

    #[test]
    fn test_missing_both_credentials_names_both() {
        let err = load(&[]).unwrap_err();

        assert_eq!(
            err,
            ConfigError::MissingVars(vec![API_KEY_VAR, SHARED_SECRET_VAR])
        );
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: LASTFM_API_KEY, LASTFM_SHARED_SECRET."
        );
    }

    #[test]
    fn test_missing_shared_secret_is_fatal() {
        let err = load(&[(API_KEY_VAR, "key")]).unwrap_err();
        assert_eq!(err, ConfigError::MissingVars(vec![SHARED_SECRET_VAR]));
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let err = load(&[(API_KEY_VAR, "  "), (SHARED_SECRET_VAR, "secret")]).unwrap_err();
        assert_eq!(err, ConfigError::MissingVars(vec![API_KEY_VAR]));
    }

    #[test]
    fn test_overrides() {
        let mut vars = CREDS.to_vec();
        vars.extend([
            ("LASTFM_USER", "someone"),
            ("LASTFM_LIMIT", "5"),
            ("LASTFM_API_URL", "http://localhost:9000/2.0/"),
            ("CACHE_DURATION", "120"),
            ("CACHE_DIR", "/tmp/np-cache"),
            ("PORT", "8080"),
        ]);

        let config = load(&vars).unwrap();

        assert_eq!(config.query(), RecentTracksQuery::new("someone", 5));
        assert_eq!(config.api_url, "http://localhost:9000/2.0/");
        assert_eq!(config.cache_duration(), Duration::seconds(120));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/np-cache"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let mut vars = CREDS.to_vec();
        vars.push(("CACHE_DURATION", "soon"));

        let err = load(&vars).unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "CACHE_DURATION",
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_huge_duration_is_clamped() {
        let mut config = load(&CREDS).unwrap();
        config.cache_duration_secs = u64::MAX;

        assert_eq!(
            config.cache_duration(),
            Duration::seconds(MAX_CACHE_DURATION_SECS as i64)
        );
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let mut vars = CREDS.to_vec();
        vars.push(("LASTFM_LIMIT", "0"));

        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: "LASTFM_LIMIT", .. })
        ));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = load(&CREDS).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("\"key\""));
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("<redacted>"));
    }
}
