//! Retry and client configuration, loadable from `~/.config/retryhelper/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_RETRY_LIMIT: u32 = 3;
const DEFAULT_INITIAL_RETRY_WAIT_MS: u64 = 500;
const DEFAULT_MAX_RETRY_WAIT_MS: u64 = 30 * 60 * 1000;

/// Invalid retry bounds or client settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("initial retry wait must be positive")]
    ZeroInitialWait,
    #[error("max retry wait ({max_ms} ms) is below the initial retry wait ({initial_ms} ms)")]
    MaxBelowInitial { initial_ms: u64, max_ms: u64 },
    #[error("{0} must be positive")]
    ZeroTimeout(&'static str),
}

/// Retry bounds for one logical call.
///
/// `retry_limit` counts retries, not attempts: a call is attempted at most
/// `retry_limit + 1` times. Construction validates `0 < initial <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRetryConfig", into = "RawRetryConfig")]
pub struct RetryConfig {
    retry_limit: u32,
    initial_wait_ms: u64,
    max_wait_ms: u64,
}

impl RetryConfig {
    pub fn new(retry_limit: u32, initial_wait_ms: u64, max_wait_ms: u64) -> Result<Self, ConfigError> {
        if initial_wait_ms == 0 {
            return Err(ConfigError::ZeroInitialWait);
        }
        if max_wait_ms < initial_wait_ms {
            return Err(ConfigError::MaxBelowInitial {
                initial_ms: initial_wait_ms,
                max_ms: max_wait_ms,
            });
        }
        Ok(Self {
            retry_limit,
            initial_wait_ms,
            max_wait_ms,
        })
    }

    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn initial_wait_ms(&self) -> u64 {
        self.initial_wait_ms
    }

    pub fn max_wait_ms(&self) -> u64 {
        self.max_wait_ms
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_RETRY_LIMIT,
            initial_wait_ms: DEFAULT_INITIAL_RETRY_WAIT_MS,
            max_wait_ms: DEFAULT_MAX_RETRY_WAIT_MS,
        }
    }
}

/// Builder starting from the defaults (3 retries, 500 ms, 30 min).
#[derive(Debug, Clone, Copy)]
pub struct RetryConfigBuilder {
    retry_limit: u32,
    initial_wait_ms: u64,
    max_wait_ms: u64,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_RETRY_LIMIT,
            initial_wait_ms: DEFAULT_INITIAL_RETRY_WAIT_MS,
            max_wait_ms: DEFAULT_MAX_RETRY_WAIT_MS,
        }
    }
}

impl RetryConfigBuilder {
    pub fn retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn initial_wait_ms(mut self, initial_wait_ms: u64) -> Self {
        self.initial_wait_ms = initial_wait_ms;
        self
    }

    pub fn max_wait_ms(mut self, max_wait_ms: u64) -> Self {
        self.max_wait_ms = max_wait_ms;
        self
    }

    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        RetryConfig::new(self.retry_limit, self.initial_wait_ms, self.max_wait_ms)
    }
}

/// On-disk shape of `RetryConfig`; missing keys fall back to defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
struct RawRetryConfig {
    retry_limit: u32,
    initial_retry_wait_ms: u64,
    max_retry_wait_ms: u64,
}

impl Default for RawRetryConfig {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl TryFrom<RawRetryConfig> for RetryConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRetryConfig) -> Result<Self, Self::Error> {
        RetryConfig::new(raw.retry_limit, raw.initial_retry_wait_ms, raw.max_retry_wait_ms)
    }
}

impl From<RetryConfig> for RawRetryConfig {
    fn from(cfg: RetryConfig) -> Self {
        Self {
            retry_limit: cfg.retry_limit,
            initial_retry_wait_ms: cfg.initial_wait_ms,
            max_retry_wait_ms: cfg.max_wait_ms,
        }
    }
}

/// Settings applied to every curl handle created by the built-in clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Whole-transfer timeout in milliseconds.
    pub timeout_ms: u64,
    pub tcp_nodelay: bool,
    pub follow_redirects: bool,
    pub max_redirections: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            timeout_ms: 60_000,
            tcp_nodelay: true,
            follow_redirects: true,
            max_redirections: 10,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("connect_timeout_ms"));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("timeout_ms"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level `config.toml`: `[retry]` and `[client]` sections, both optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("retryhelper")?;
    Ok(xdg_dirs
        .get_config_home()
        .join("retryhelper")
        .join("config.toml"))
}

/// Parse and validate a config file.
pub fn load_from_path(path: &Path) -> Result<HelperConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: HelperConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    cfg.client.validate()?;
    Ok(cfg)
}

/// Load the user config, or built-in defaults when no file exists.
pub fn load_or_default() -> Result<HelperConfig> {
    let path = config_path()?;
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(HelperConfig::default());
    }
    load_from_path(&path)
}
