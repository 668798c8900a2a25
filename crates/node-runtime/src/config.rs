//! Runtime configuration from the environment.
//!
//! Recognized variables:
//!
//! - `PORT`: listen port (default 8080)
//! - `CORS_ORIGIN`: comma list of origins, or `*` (default)
//! - `BACKEND_URL`: comma list of backend URLs; the scheme selects the
//!   kind (`memory://`, `file://path`, `http(s)://…`, `ws(s)://…`).
//!   Several URLs compose as broadcast writes + first-match reads.
//! - `SCHEMA_MODULE`: named validator set (`standard`, `open`, `none`)

use anyhow::{bail, Context, Result};

/// Parsed runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub backend_urls: Vec<String>,
    pub schema_module: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_origins: vec!["*".to_string()],
            backend_urls: vec!["memory://".to_string()],
            schema_module: "standard".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Read the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT={:?} is not a port number", raw))?,
            Err(_) => defaults.port,
        };

        let cors_origins = match std::env::var("CORS_ORIGIN") {
            Ok(raw) => split_list(&raw),
            Err(_) => defaults.cors_origins,
        };

        let backend_urls = match std::env::var("BACKEND_URL") {
            Ok(raw) => split_list(&raw),
            Err(_) => defaults.backend_urls,
        };
        if backend_urls.is_empty() {
            bail!("BACKEND_URL is set but names no backends");
        }

        let schema_module =
            std::env::var("SCHEMA_MODULE").unwrap_or(defaults.schema_module);

        Ok(Self {
            port,
            cors_origins,
            backend_urls,
            schema_module,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
