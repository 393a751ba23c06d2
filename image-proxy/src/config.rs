//! Service configuration read from the environment.
//!
//! Every value has a default, so the proxy starts with no configuration at
//! all. Values that fail to parse are logged and replaced by their default.

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thumbnail_pipeline::{ResampleStrategy, ThumbnailConfig, DEFAULT_LONG_SIDE_PX, DEFAULT_QUALITY};

use crate::handler::QUALITY_RANGE;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_LONG_SIDE_PX: i32 = 2048;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_SOURCE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Long side used when a request has no usable `LongSidePx` header
    pub default_long_side_px: i32,
    /// Requests above this long side are rejected before fetching
    pub max_long_side_px: i32,
    /// Quality used when a request has no usable `Quality` header
    pub default_quality: i32,
    /// Size of the thumbnail worker pool
    pub worker_threads: usize,
    /// Upper bound on a whole origin fetch, body included
    pub fetch_timeout: Duration,
    /// Largest origin body accepted
    pub max_source_bytes: u64,
    pub thumbnail: ThumbnailConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            default_long_side_px: DEFAULT_LONG_SIDE_PX,
            max_long_side_px: DEFAULT_MAX_LONG_SIDE_PX,
            default_quality: DEFAULT_QUALITY,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            thumbnail: ThumbnailConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Read the configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_quality = parse_or(&lookup, "DEFAULT_QUALITY", defaults.default_quality)
            .clamp(*QUALITY_RANGE.start(), *QUALITY_RANGE.end());
        let fetch_timeout_secs = parse_or(&lookup, "FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS);

        Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr),
            port: parse_or(&lookup, "PORT", defaults.port),
            default_long_side_px: parse_or(&lookup, "DEFAULT_LONG_SIDE_PX", defaults.default_long_side_px),
            max_long_side_px: parse_or(&lookup, "MAX_LONG_SIDE_PX", defaults.max_long_side_px).max(1),
            default_quality,
            worker_threads: parse_or(&lookup, "WORKER_THREADS", defaults.worker_threads).max(1),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs.max(1)),
            max_source_bytes: parse_or(&lookup, "MAX_SOURCE_BYTES", defaults.max_source_bytes).max(1),
            thumbnail: ThumbnailConfig {
                strategy: parse_or::<ResampleStrategy>(&lookup, "RESAMPLE_STRATEGY", defaults.thumbnail.strategy),
            },
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, fallback = %default, "Invalid configuration value");
            default
        }
    }
}
