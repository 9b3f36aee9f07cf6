use crate::error::{CourierError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Retry and backoff parameters for the delivery engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryPolicy {
    /// Extra send rounds beyond the first (inclusive count).
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound on any single backoff sleep.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Sliding-window admission parameters, keyed by sender address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitPolicy {
    pub max_requests: usize,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// Per-provider circuit breaker parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerPolicy {
    /// Consecutive failures before the breaker opens.
    pub threshold: u32,
    /// Cooldown before an open breaker permits a trial call.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server bind address
    pub bind_addr: SocketAddr,

    /// Log level for the courier target
    pub log_level: String,

    pub delivery: DeliveryPolicy,
    pub rate_limit: RateLimitPolicy,
    pub breaker: BreakerPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            delivery: DeliveryPolicy::default(),
            rate_limit: RateLimitPolicy::default(),
            breaker: BreakerPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        Ok(Config {
            bind_addr: env_parse("BIND_ADDR", defaults.bind_addr)?,
            log_level: env_parse("LOG_LEVEL", defaults.log_level)?,
            delivery: DeliveryPolicy {
                max_retries: env_parse("MAX_RETRIES", defaults.delivery.max_retries)?,
                base_delay: env_parse_millis("BASE_DELAY_MS", defaults.delivery.base_delay)?,
                max_delay: defaults.delivery.max_delay,
            },
            rate_limit: RateLimitPolicy {
                max_requests: env_parse(
                    "RATE_LIMIT_MAX_REQUESTS",
                    defaults.rate_limit.max_requests,
                )?,
                window: env_parse_millis("RATE_LIMIT_WINDOW_MS", defaults.rate_limit.window)?,
            },
            breaker: BreakerPolicy {
                threshold: env_parse("BREAKER_THRESHOLD", defaults.breaker.threshold)?,
                timeout: env_parse_millis("BREAKER_TIMEOUT_MS", defaults.breaker.timeout)?,
            },
        })
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CourierError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| CourierError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| CourierError::Config(format!("invalid value for {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn env_parse_millis(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => {
            let ms: u64 = raw
                .parse()
                .map_err(|_| CourierError::Config(format!("invalid value for {}: {}", key, raw)))?;
            Ok(Duration::from_millis(ms))
        }
        Err(_) => Ok(default),
    }
}
