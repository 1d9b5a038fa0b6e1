//! Endpoint and pagination configuration.
//!
//! [`ApiConfig`] is an immutable value handed to the fetcher at construction.
//! It is assembled in three layers, later layers winning:
//!
//! 1. Built-in defaults ([`ApiConfig::default`])
//! 2. An optional YAML file (`--config`)
//! 3. Command-line flags and environment variables
//!
//! # YAML Example
//!
//! ```yaml
//! endpoint: https://evat.oblek.com.mx/notas-api/notas
//! timeout_secs: 60
//! items_field: notas
//! total_field: total
//! limit_param: limit
//! page_param: page
//! max_pages: 200
//! ```
//!
//! Every key is optional. The bearer token is deliberately not read from the
//! file; pass it with `--token` or `NOTAS_API_TOKEN`.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_ENDPOINT: &str = "https://evat.oblek.com.mx/notas-api/notas";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid endpoint {endpoint:?}: {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("max_pages must be greater than zero")]
    ZeroMaxPages,
}

/// Connection and pagination settings for the results endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub endpoint: String,
    pub token: Option<String>,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout_secs: u64,
    /// Name of the array field holding the records.
    pub items_field: String,
    /// Name of the optional numeric field holding the server-side total.
    pub total_field: String,
    /// Query parameter carrying the page size.
    pub limit_param: String,
    /// Query parameter carrying the page indicator, sent from the second request on.
    pub page_param: String,
    /// Hard cap on requests per fetch.
    pub max_pages: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            timeout_secs: 60,
            items_field: "notas".to_string(),
            total_field: "total".to_string(),
            limit_param: "limit".to_string(),
            page_param: "page".to_string(),
            max_pages: 1000,
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("items_field", &self.items_field)
            .field("total_field", &self.total_field)
            .field("limit_param", &self.limit_param)
            .field("page_param", &self.page_param)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

/// The YAML file shape; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    items_field: Option<String>,
    total_field: Option<String>,
    limit_param: Option<String>,
    page_param: Option<String>,
    max_pages: Option<u32>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub max_pages: Option<u32>,
}

impl ApiConfig {
    /// Parse a YAML document on top of the defaults.
    pub fn from_yaml_str(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;

        let defaults = Self::default();
        Ok(Self {
            endpoint: file.endpoint.unwrap_or(defaults.endpoint),
            token: None,
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
            items_field: file.items_field.unwrap_or(defaults.items_field),
            total_field: file.total_field.unwrap_or(defaults.total_field),
            limit_param: file.limit_param.unwrap_or(defaults.limit_param),
            page_param: file.page_param.unwrap_or(defaults.page_param),
            max_pages: file.max_pages.unwrap_or(defaults.max_pages),
        })
    }

    /// Load the layered configuration and validate it.
    #[instrument(level = "info", skip(overrides))]
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let shown = p.display().to_string();
                let yaml = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: shown.clone(),
                    source,
                })?;
                let config = Self::from_yaml_str(&yaml, &shown)?;
                info!(path = %shown, "Loaded configuration file");
                config
            }
            None => Self::default(),
        };

        if let Some(endpoint) = overrides.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(max_pages) = overrides.max_pages {
            config.max_pages = max_pages;
        }
        config.token = overrides.token.filter(|t| !t.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.endpoint).map_err(|source| ConfigError::Endpoint {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroMaxPages);
        }
        Ok(())
    }

    /// Headers sent with every request.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("accept".to_string(), "*/*".to_string())];
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }
}
