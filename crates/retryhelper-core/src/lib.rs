pub mod config;
pub mod logging;

pub mod blocking;
pub mod client;
pub mod helper;
pub mod http;
pub mod retry;

pub use config::{ClientConfig, ConfigError, HelperConfig, RetryConfig};
pub use helper::RetryHelper;
pub use retry::{GiveUpReason, RetryError, RetryExecutor, Retryable};
