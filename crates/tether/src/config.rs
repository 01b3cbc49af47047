//! Connection manager configuration.
//!
//! Every field has a default, so an empty JSON object (or
//! [`ConnectionConfig::default()`]) is a working configuration. Durations are
//! written as milliseconds on the wire:
//!
//! ```json
//! { "max_connected_players": 4, "reconnect_delay_ms": 2000 }
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Deserializer};
use tether_session::SessionConfig;
use tracing::warn;

/// Tunables for approval, reconnection, and shutdown.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Players a host or server admits, counting a host's own player.
    pub max_connected_players: usize,

    /// How many times a client retries after losing its connection.
    /// 0 gives up immediately.
    pub reconnect_attempts: u32,

    /// Wait between reconnect attempts (the first attempt runs immediately).
    #[serde(rename = "reconnect_delay_ms", deserialize_with = "millis")]
    pub reconnect_delay: Duration,

    /// Upper bound of the random delay added to `reconnect_delay`, so that
    /// clients dropped together do not all come back in the same instant.
    #[serde(rename = "reconnect_jitter_ms", deserialize_with = "millis")]
    pub reconnect_jitter: Duration,

    /// How long a host or server waits for clients to leave after telling
    /// them why they are being disconnected.
    #[serde(rename = "disconnect_drain_ms", deserialize_with = "millis")]
    pub disconnect_drain: Duration,

    /// Connection payloads larger than this are rejected unread.
    pub max_connect_payload: usize,

    /// Build flavour of this process. Clients and servers must agree.
    pub debug_build: bool,

    pub session: SessionConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_connected_players: 8,
            reconnect_attempts: 2,
            reconnect_delay: Duration::from_secs(5),
            reconnect_jitter: Duration::ZERO,
            disconnect_drain: Duration::from_millis(500),
            max_connect_payload: 1024,
            debug_build: false,
            session: SessionConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Upper bound for `reconnect_attempts`.
    pub const MAX_RECONNECT_ATTEMPTS: u32 = 100;

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called by the manager builder. Rules:
    /// - `max_connected_players` is at least 1.
    /// - `reconnect_attempts` capped to [`Self::MAX_RECONNECT_ATTEMPTS`].
    /// - `max_connect_payload` is at least 1.
    pub fn validated(mut self) -> Self {
        if self.max_connected_players == 0 {
            warn!("max_connected_players is 0, admitting at least one player");
            self.max_connected_players = 1;
        }
        if self.reconnect_attempts > Self::MAX_RECONNECT_ATTEMPTS {
            warn!(
                attempts = self.reconnect_attempts,
                max = Self::MAX_RECONNECT_ATTEMPTS,
                "reconnect_attempts exceeds maximum, clamping"
            );
            self.reconnect_attempts = Self::MAX_RECONNECT_ATTEMPTS;
        }
        if self.max_connect_payload == 0 {
            warn!("max_connect_payload is 0, raising to 1 byte");
            self.max_connect_payload = 1;
        }
        self
    }

    /// Delay before the next reconnect attempt: `reconnect_delay` plus a
    /// random jitter in `[0, reconnect_jitter)`.
    pub fn retry_delay(&self) -> Duration {
        let jitter_ms = self.reconnect_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..jitter_ms))
        } else {
            Duration::ZERO
        };
        self.reconnect_delay + jitter
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_connected_players, 8);
        assert_eq!(config.reconnect_attempts, 2);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.disconnect_drain, Duration::from_millis(500));
        assert_eq!(config.max_connect_payload, 1024);
        assert!(!config.debug_build);
        assert_eq!(config.session.reconnect_grace_secs, 30);
    }

    #[test]
    fn test_deserialize_empty_object_uses_defaults() {
        let config: ConnectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_connected_players, 8);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_durations_as_millis() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{
                "reconnect_attempts": 3,
                "reconnect_delay_ms": 250,
                "reconnect_jitter_ms": 100,
                "disconnect_drain_ms": 50,
                "session": { "reconnect_grace_secs": 5 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.reconnect_attempts, 3);
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.reconnect_jitter, Duration::from_millis(100));
        assert_eq!(config.disconnect_drain, Duration::from_millis(50));
        assert_eq!(config.session.reconnect_grace_secs, 5);
    }

    #[test]
    fn test_validated_zero_players_raised_to_one() {
        let config = ConnectionConfig {
            max_connected_players: 0,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.max_connected_players, 1);
    }

    #[test]
    fn test_validated_attempts_clamped() {
        let config = ConnectionConfig {
            reconnect_attempts: 10_000,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.reconnect_attempts, ConnectionConfig::MAX_RECONNECT_ATTEMPTS);
    }

    #[test]
    fn test_validated_zero_attempts_kept() {
        let config = ConnectionConfig {
            reconnect_attempts: 0,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.reconnect_attempts, 0);
    }

    #[test]
    fn test_retry_delay_without_jitter_is_exact() {
        let config = ConnectionConfig {
            reconnect_delay: Duration::from_millis(300),
            ..Default::default()
        };
        assert_eq!(config.retry_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_retry_delay_jitter_stays_in_range() {
        let config = ConnectionConfig {
            reconnect_delay: Duration::from_millis(300),
            reconnect_jitter: Duration::from_millis(50),
            ..Default::default()
        };
        for _ in 0..100 {
            let delay = config.retry_delay();
            assert!(delay >= Duration::from_millis(300));
            assert!(delay < Duration::from_millis(350));
        }
    }
}
