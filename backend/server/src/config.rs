use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_ORIGINS: &str = "http://127.0.0.1:5500,http://localhost:5500";
const DEFAULT_ORIGIN_REGEX: &str = r"^http://(127\.0\.0\.1|localhost):55\d{2}$";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub cookie_secure: bool,
    pub allowed_origins: Vec<String>,
    pub allowed_origin_regex: Regex,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let origin_regex: String = try_load("ALLOWED_ORIGIN_REGEX", DEFAULT_ORIGIN_REGEX)?;

        Ok(Self {
            port: try_load("RUST_PORT", "8000")?,
            data_dir: try_load("DATA_DIR", "data")?,
            store_backend: try_load("STORE_BACKEND", "file")?,
            cookie_secure: try_load("COOKIE_SECURE", "false")?,
            allowed_origins: split_origins(&try_load::<String>(
                "ALLOWED_ORIGINS",
                DEFAULT_ORIGINS,
            )?),
            allowed_origin_regex: compile_origin_regex("ALLOWED_ORIGIN_REGEX", &origin_regex)?,
        })
    }

    /// Defaults with the given data directory, without reading the environment.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: 0,
            data_dir: data_dir.into(),
            store_backend: StoreBackend::File,
            cookie_secure: false,
            allowed_origins: split_origins(DEFAULT_ORIGINS),
            allowed_origin_regex: compile_origin_regex(
                "ALLOWED_ORIGIN_REGEX",
                DEFAULT_ORIGIN_REGEX,
            )?,
        })
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
            || self.allowed_origin_regex.is_match(origin)
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("{key} not set, using default");
    })
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

// full match only
fn compile_origin_regex(key: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::for_data_dir("data").unwrap()
    }

    #[test]
    fn test_exact_origins() {
        let config = config();
        assert!(config.origin_allowed("http://127.0.0.1:5500"));
        assert!(config.origin_allowed("http://localhost:5500"));
    }

    #[test]
    fn test_origin_regex() {
        let config = config();
        assert!(config.origin_allowed("http://localhost:5501"));
        assert!(config.origin_allowed("http://127.0.0.1:5599"));
        assert!(!config.origin_allowed("http://localhost:5600"));
        assert!(!config.origin_allowed("https://localhost:5501"));
        assert!(!config.origin_allowed("http://localhost:5501.example.com"));
        assert!(!config.origin_allowed("http://example.com"));
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins(" http://a:1 ,,http://b:2,"),
            vec!["http://a:1".to_string(), "http://b:2".to_string()]
        );
    }

    #[test]
    fn test_store_backend() {
        assert_eq!("file".parse::<StoreBackend>(), Ok(StoreBackend::File));
        assert_eq!(" Memory ".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_bad_regex() {
        assert!(compile_origin_regex("ALLOWED_ORIGIN_REGEX", "(").is_err());
    }
}
