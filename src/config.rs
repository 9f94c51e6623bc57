//! Application configuration: where the API lives and how to talk to it.
//!
//! The base URL is resolved from, in order: an explicit override (the
//! `--base-url` flag), the `API_BASE_URL` environment variable, the
//! `base_api_url` entry of `<config_dir>/apiclient/config.json`, and finally
//! [`DEFAULT_BASE_URL`].

use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::{ClientConfig, DEFAULT_TIMEOUT};
use crate::runtime::Runtime;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

pub const BASE_URL_ENV: &str = "API_BASE_URL";

/// Directory name under the platform config dir.
pub const APP_DIR_NAME: &str = "apiclient";

pub const CONFIG_FILE: &str = "config.json";

/// Contents of `config.json`. Every field is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub base_api_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub headers: BTreeMap<String, String>,
}

impl FileConfig {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No config file at {:?}", path);
            return Ok(Self::default());
        }
        let content = runtime.read_to_string(path)?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config file {:?}", path))
    }
}

/// Fully resolved settings for the command line front-end.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_dir: PathBuf,
    pub base_url: String,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
}

impl AppConfig {
    #[tracing::instrument(skip(runtime))]
    pub fn resolve<R: Runtime>(
        runtime: &R,
        app_dir: Option<PathBuf>,
        base_url: Option<String>,
    ) -> Result<Self> {
        let app_dir = match app_dir {
            Some(dir) => dir,
            None => default_app_dir(runtime)?,
        };
        let file = FileConfig::load(runtime, &app_dir.join(CONFIG_FILE))?;

        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| {
                runtime
                    .env_var(BASE_URL_ENV)
                    .ok()
                    .filter(|u| !u.trim().is_empty())
            })
            .or(file.base_api_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = file
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);

        debug!("Using API base URL {}", base_url);

        Ok(Self {
            app_dir,
            base_url,
            timeout,
            headers: file.headers,
        })
    }

    /// Builds the client settings. Header entries must be valid HTTP headers.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::new(self.base_url.clone()).with_timeout(self.timeout);
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name {:?} in config", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {:?} in config", name))?;
            config = config.with_header(name, value);
        }
        Ok(config)
    }
}

pub fn default_app_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    runtime
        .config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| anyhow!("Could not determine the config directory; pass --config-dir"))
}
