use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::quote::DEFAULT_QUOTE_API_URL;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8888";

/// Shape of the optional JSON file named by `SLACKER_CONFIG`. Every key is
/// optional; environment variables override whatever the file sets.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FileConfig {
    tokens: Option<Vec<String>>,
    listen_address: Option<String>,
    async_response: Option<bool>,
    /// Seconds.
    http_client_timeout: Option<u64>,
    quote_api_url: Option<String>,
    max_request_bytes: Option<usize>,
}

#[derive(Clone)]
pub struct AppConfig {
    /// Accepted verification tokens. Empty accepts every request.
    pub tokens: HashSet<String>,
    pub listen_address: String,
    pub async_response: bool,
    /// Deadline for quote provider calls. Zero means no deadline.
    pub http_client_timeout: Duration,
    pub quote_api_url: String,
    pub max_request_bytes: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tokens: HashSet::new(),
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            async_response: false,
            http_client_timeout: Duration::ZERO,
            quote_api_url: DEFAULT_QUOTE_API_URL.to_string(),
            max_request_bytes: None,
        }
    }
}

// Tokens are secrets; only their count is printed.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("tokens", &format_args!("<{} redacted>", self.tokens.len()))
            .field("listen_address", &self.listen_address)
            .field("async_response", &self.async_response)
            .field("http_client_timeout", &self.http_client_timeout)
            .field("quote_api_url", &self.quote_api_url)
            .field("max_request_bytes", &self.max_request_bytes)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env::var("SLACKER_CONFIG").ok().filter(|p| !p.trim().is_empty()) {
            let content = fs::read_to_string(&path).with_context(|| {
                format!("Failed to read SLACKER_CONFIG '{}': file unreadable", path)
            })?;
            let file = serde_json::from_str::<FileConfig>(&content).with_context(|| {
                format!(
                    "Failed to parse SLACKER_CONFIG '{}': invalid JSON configuration",
                    path
                )
            })?;
            config.apply_file(file);
        }

        if let Ok(raw) = env::var("SLACKER_TOKENS") {
            config.tokens = parse_token_list(&raw);
        }
        if let Some(addr) = parse_optional_string("SLACKER_LISTEN_ADDRESS")? {
            config.listen_address = addr;
        }
        if let Some(flag) = parse_bool_env("SLACKER_ASYNC_RESPONSE")? {
            config.async_response = flag;
        }
        if let Some(secs) = parse_optional_u64("SLACKER_HTTP_CLIENT_TIMEOUT")? {
            config.http_client_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = parse_optional_string("SLACKER_QUOTE_API_URL")? {
            config.quote_api_url = url;
        }
        if let Some(limit) = parse_optional_u64("SLACKER_MAX_REQUEST_BYTES")? {
            let limit = usize::try_from(limit).with_context(|| {
                format!(
                    "SLACKER_MAX_REQUEST_BYTES value {} does not fit this platform",
                    limit
                )
            })?;
            config.max_request_bytes = Some(limit);
        }

        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(tokens) = file.tokens {
            self.tokens = tokens
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Some(addr) = file.listen_address {
            self.listen_address = addr;
        }
        if let Some(flag) = file.async_response {
            self.async_response = flag;
        }
        if let Some(secs) = file.http_client_timeout {
            self.http_client_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = file.quote_api_url {
            self.quote_api_url = url;
        }
        if file.max_request_bytes.is_some() {
            self.max_request_bytes = file.max_request_bytes;
        }
    }
}

fn parse_token_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_optional_string(var: &str) -> Result<Option<String>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("{} is not valid unicode", var)),
    }
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match parse_optional_string(var)? {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a non-negative integer", var)),
        None => Ok(None),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match parse_optional_string(var)? {
        Some(value) => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        None => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
