//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use tracing::warn;

/// Relay server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// `INKBOARD_ADDR`, default `0.0.0.0:3030`.
    pub addr: SocketAddr,
    /// `INKBOARD_CHANNEL_CAPACITY`: broadcast buffer per scope.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3030)),
            channel_capacity: 256,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            addr: parse_or(&lookup, "INKBOARD_ADDR", defaults.addr),
            channel_capacity: parse_or(&lookup, "INKBOARD_CHANNEL_CAPACITY", defaults.channel_capacity)
                .max(1),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
