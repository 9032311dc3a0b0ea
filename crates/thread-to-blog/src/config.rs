use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use blog_common::openrouter::{OpenRouterConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::error::AppError;

const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Application configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub openrouter: OpenRouterConfig,
    /// Requests allowed per client per window.
    pub rate_limit_points: u32,
    pub rate_limit_window: Duration,
    /// How often expired rate-limit entries are dropped.
    pub rate_limit_sweep_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All optional:
    /// - `BIND_ADDR` (default `0.0.0.0:3000`)
    /// - `OPENROUTER_API_KEY`: without it every generation request fails
    /// - `OPENROUTER_BASE_URL`, `OPENROUTER_MODEL`
    /// - `OPENROUTER_TIMEOUT_SECS`: unset means no timeout on the upstream call
    /// - `OPENROUTER_MAX_ERROR_BODY_BYTES` (default 8192)
    /// - `RATE_LIMIT_POINTS` (default 10), `RATE_LIMIT_WINDOW_SECS` (default 86400),
    ///   `RATE_LIMIT_SWEEP_SECS` (default 600)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let bind_addr = parse_var(&get, "BIND_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let base_url = get("OPENROUTER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = get("OPENROUTER_API_KEY").filter(|k| !k.trim().is_empty());
        let model = get("OPENROUTER_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout = parse_var::<u64>(&get, "OPENROUTER_TIMEOUT_SECS")?
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);
        let max_error_body_bytes =
            parse_var::<usize>(&get, "OPENROUTER_MAX_ERROR_BODY_BYTES")?.unwrap_or(8 * 1024);

        let openrouter = OpenRouterConfig {
            api_key,
            model,
            timeout,
            max_error_body_bytes,
            ..OpenRouterConfig::default()
        }
        .with_base_url(&base_url);

        let rate_limit_points = parse_var::<u32>(&get, "RATE_LIMIT_POINTS")?.unwrap_or(10);
        if rate_limit_points == 0 {
            return Err(AppError::Config("RATE_LIMIT_POINTS must be greater than 0".to_string()));
        }

        let window_secs = parse_var::<u64>(&get, "RATE_LIMIT_WINDOW_SECS")?.unwrap_or(86_400);
        if window_secs == 0 || window_secs > MAX_WINDOW_SECS {
            return Err(AppError::Config(format!(
                "RATE_LIMIT_WINDOW_SECS must be between 1 and {MAX_WINDOW_SECS}"
            )));
        }

        let sweep_secs = parse_var::<u64>(&get, "RATE_LIMIT_SWEEP_SECS")?.unwrap_or(600);
        if sweep_secs == 0 {
            return Err(AppError::Config(
                "RATE_LIMIT_SWEEP_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            openrouter,
            rate_limit_points,
            rate_limit_window: Duration::from_secs(window_secs),
            rate_limit_sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

/// `Ok(None)` when unset; a value that does not parse is an error rather than a silent default.
fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("invalid {name}={raw:?}: {e}"))),
    }
}
