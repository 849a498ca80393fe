// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Tunables for connection lifecycle, RPC deadlines, and local persistence.
/// The library itself takes a plain [`Config`]; [`crate::bin`] wires it to
/// `clap` for the demo binary only.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
    /// Per-RPC deadline in milliseconds.
    #[arg(long, default_value_t = 30_000, env = "PUSH_CLIENT_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Delay between reconnect attempts in milliseconds.
    #[arg(long, default_value_t = 2_000, env = "PUSH_CLIENT_RECONNECT_INTERVAL_MS")]
    pub reconnect_interval_ms: u64,

    /// How often the connection manager pings the broker while connected.
    #[arg(long, default_value_t = 20_000, env = "PUSH_CLIENT_PING_INTERVAL_MS")]
    pub ping_interval_ms: u64,

    /// How long a ping may go unanswered before the connection is torn down.
    #[arg(long, default_value_t = 5_000, env = "PUSH_CLIENT_PING_TIMEOUT_MS")]
    pub ping_timeout_ms: u64,

    /// How often the state machine snapshot is flushed to the local store.
    #[arg(long, default_value_t = 10_000, env = "PUSH_CLIENT_SAVE_INTERVAL_MS")]
    pub save_interval_ms: u64,

    /// Capacity of the in-band message history ring.
    #[arg(long, default_value_t = crate::state::DEFAULT_RING_CAPACITY, env = "PUSH_CLIENT_RING_CAPACITY")]
    pub ring_capacity: usize,

    /// Broker endpoint, e.g. `https://push.example.com:443`.
    #[arg(long, env = "PUSH_CLIENT_ENDPOINT")]
    pub endpoint: String,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            reconnect_interval_ms: 2_000,
            ping_interval_ms: 20_000,
            ping_timeout_ms: 5_000,
            save_interval_ms: 10_000,
            ring_capacity: crate::state::DEFAULT_RING_CAPACITY,
            endpoint: String::new(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
