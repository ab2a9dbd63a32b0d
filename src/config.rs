// Runtime configuration, read from the environment.
//
// Every knob has a default that points at a local development backend, so
// running the CLI with no environment set talks to http://127.0.0.1:8000.

use crate::error::ApiError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1";
pub const DEFAULT_AUTH_SCHEME: &str = "Token";
pub const DEFAULT_FOLDER_ID: u64 = 1;
const TOKEN_FILE_NAME: &str = ".timemine_token";

/// Settings used to build the API client and the token store.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// API root, without a trailing slash.
    pub api_url: String,
    /// Scheme placed before the token in the `Authorization` header.
    pub auth_scheme: String,
    /// Folder new uploads are filed under.
    pub folder_id: u64,
    pub token_file: PathBuf,
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            auth_scheme: DEFAULT_AUTH_SCHEME.into(),
            folder_id: DEFAULT_FOLDER_ID,
            token_file: default_token_file(),
            timeout: None,
        }
    }
}

impl Config {
    /// Build a config from the `TIMEMINE_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but with an injectable variable lookup, which
    /// keeps tests away from the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("TIMEMINE_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(scheme) = lookup("TIMEMINE_AUTH_SCHEME") {
            config.auth_scheme = scheme;
        }
        if let Some(raw) = lookup("TIMEMINE_FOLDER_ID") {
            config.folder_id = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::Config(format!("TIMEMINE_FOLDER_ID is not a number: {raw}")))?;
        }
        if let Some(path) = lookup("TIMEMINE_TOKEN_FILE") {
            config.token_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup("TIMEMINE_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::Config(format!("TIMEMINE_TIMEOUT_SECS is not a number: {raw}")))?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn default_token_file() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(TOKEN_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.auth_scheme, "Token");
        assert_eq!(config.folder_id, 1);
        assert!(config.token_file.ends_with(".timemine_token"));
        assert!(config.timeout.is_none());
    }

    #[test]
    fn overrides_and_trims_url() {
        let config = Config::from_lookup(lookup_from(&[
            ("TIMEMINE_API_URL", "https://photos.example.com/api/v1/"),
            ("TIMEMINE_AUTH_SCHEME", "Bearer"),
            ("TIMEMINE_FOLDER_ID", "7"),
            ("TIMEMINE_TOKEN_FILE", "/tmp/tok"),
            ("TIMEMINE_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://photos.example.com/api/v1");
        assert_eq!(config.auth_scheme, "Bearer");
        assert_eq!(config.folder_id, 7);
        assert_eq!(config.token_file, PathBuf::from("/tmp/tok"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_bad_folder_id() {
        let err = Config::from_lookup(lookup_from(&[("TIMEMINE_FOLDER_ID", "abc")])).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
