//! Runtime configuration
//!
//! Every setting has a default and can be overridden from the environment.
//!
//! ## Environment
//! ```bash
//! HASS_BRIDGE_JWT_SECRET=your-super-secret-key-at-least-32-chars
//! HASS_BRIDGE_BIND=0.0.0.0:3000
//! HASS_BRIDGE_MAX_CLIENTS=1000
//! HASS_BRIDGE_TOKEN_LIFETIME=86400
//! HASS_BRIDGE_REJECT_UNAUTHENTICATED=false
//! HASS_BRIDGE_TRUST_FORWARDED_FOR=false
//! ```

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Minimum accepted length of the JWT signing secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Configuration errors raised while loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HASS_BRIDGE_JWT_SECRET must be at least {} characters", MIN_SECRET_LENGTH)]
    SecretTooShort,
    #[error("invalid bind address '{0}'")]
    InvalidBindAddr(String),
}

/// Token validation and issuance settings
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HS256 signing secret; `None` means validation always fails
    pub jwt_secret: Option<String>,
    /// Tokens shorter than this are rejected before decoding
    pub min_token_length: usize,
    /// Failed attempts per address before lockout
    pub max_failed_attempts: u32,
    /// How long a locked-out address stays blocked
    pub lockout_duration: Duration,
    /// Lifetime stamped into generated tokens
    pub token_lifetime: Duration,
    /// Maximum accepted `now - iat`
    pub max_token_age: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            min_token_length: 32,
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
            token_lifetime: Duration::from_secs(24 * 60 * 60),
            max_token_age: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

impl TokenConfig {
    /// Config with a signing secret and default limits
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Some(secret.into()),
            ..Self::default()
        }
    }
}

/// Push channel settings
#[derive(Debug, Clone)]
pub struct SseConfig {
    /// Registry capacity
    pub max_clients: usize,
    /// Interval between keep-alive pings per client
    pub ping_interval: Duration,
    /// Shared maintenance tick
    pub cleanup_interval: Duration,
    /// Idle time after which a client is evicted
    pub client_timeout: Duration,
    /// Messages allowed per client per window
    pub max_messages_per_window: u32,
    /// Fixed rate-limit window
    pub rate_limit_window: Duration,
    /// Bound on the last-known-state cache
    pub max_cached_entities: usize,
    /// Refuse connections whose token fails validation instead of
    /// registering them unauthenticated
    pub reject_unauthenticated: bool,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            max_clients: 1000,
            ping_interval: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(10),
            client_timeout: Duration::from_secs(5 * 60),
            max_messages_per_window: 100,
            rate_limit_window: Duration::from_secs(60),
            max_cached_entities: 10_000,
            reject_unauthenticated: false,
        }
    }
}

/// Top-level bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind_addr: SocketAddr,
    /// Charge failed token attempts to the first `X-Forwarded-For` hop
    /// instead of the socket peer
    pub trust_forwarded_for: bool,
    pub token: TokenConfig,
    pub sse: SseConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            trust_forwarded_for: false,
            token: TokenConfig::default(),
            sse: SseConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Create from environment variables
    ///
    /// Environment:
    /// - HASS_BRIDGE_BIND: listen address (default 0.0.0.0:3000)
    /// - HASS_BRIDGE_JWT_SECRET: signing secret (optional, min 32 chars)
    /// - HASS_BRIDGE_TOKEN_LIFETIME / HASS_BRIDGE_MAX_TOKEN_AGE: seconds
    /// - HASS_BRIDGE_MAX_FAILED_ATTEMPTS / HASS_BRIDGE_LOCKOUT_SECS
    /// - HASS_BRIDGE_MAX_CLIENTS / HASS_BRIDGE_PING_SECS / HASS_BRIDGE_CLEANUP_SECS
    /// - HASS_BRIDGE_CLIENT_TIMEOUT_SECS
    /// - HASS_BRIDGE_RATE_LIMIT / HASS_BRIDGE_RATE_WINDOW_SECS
    /// - HASS_BRIDGE_MAX_CACHED_ENTITIES
    /// - HASS_BRIDGE_REJECT_UNAUTHENTICATED: true/false
    /// - HASS_BRIDGE_TRUST_FORWARDED_FOR: true/false (only behind a proxy)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("HASS_BRIDGE_BIND") {
            config.bind_addr = bind
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr(bind.clone()))?;
        }

        match std::env::var("HASS_BRIDGE_JWT_SECRET") {
            Ok(secret) if secret.len() < MIN_SECRET_LENGTH => {
                return Err(ConfigError::SecretTooShort);
            }
            Ok(secret) => config.token.jwt_secret = Some(secret),
            Err(_) => warn!("HASS_BRIDGE_JWT_SECRET not set, every client will be unauthenticated"),
        }

        override_parsed("HASS_BRIDGE_TRUST_FORWARDED_FOR", &mut config.trust_forwarded_for);

        let token = &mut config.token;
        override_secs("HASS_BRIDGE_TOKEN_LIFETIME", &mut token.token_lifetime);
        override_secs("HASS_BRIDGE_MAX_TOKEN_AGE", &mut token.max_token_age);
        override_secs("HASS_BRIDGE_LOCKOUT_SECS", &mut token.lockout_duration);
        override_parsed("HASS_BRIDGE_MAX_FAILED_ATTEMPTS", &mut token.max_failed_attempts);

        let sse = &mut config.sse;
        override_parsed("HASS_BRIDGE_MAX_CLIENTS", &mut sse.max_clients);
        override_secs("HASS_BRIDGE_PING_SECS", &mut sse.ping_interval);
        override_secs("HASS_BRIDGE_CLEANUP_SECS", &mut sse.cleanup_interval);
        override_secs("HASS_BRIDGE_CLIENT_TIMEOUT_SECS", &mut sse.client_timeout);
        override_parsed("HASS_BRIDGE_RATE_LIMIT", &mut sse.max_messages_per_window);
        override_secs("HASS_BRIDGE_RATE_WINDOW_SECS", &mut sse.rate_limit_window);
        override_parsed("HASS_BRIDGE_MAX_CACHED_ENTITIES", &mut sse.max_cached_entities);
        override_parsed("HASS_BRIDGE_REJECT_UNAUTHENTICATED", &mut sse.reject_unauthenticated);

        Ok(config)
    }
}

/// Replace `target` with the parsed env value, keeping the default on parse errors
fn override_parsed<T: FromStr>(var: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!(var, value = %raw, "ignoring unparseable setting"),
        }
    }
}

fn override_secs(var: &str, target: &mut Duration) {
    let mut secs = target.as_secs();
    override_parsed(var, &mut secs);
    *target = Duration::from_secs(secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.sse.max_clients, 1000);
        assert_eq!(config.sse.max_messages_per_window, 100);
        assert_eq!(config.token.max_failed_attempts, 5);
        assert_eq!(config.token.min_token_length, 32);
        assert!(config.token.jwt_secret.is_none());
        assert!(!config.sse.reject_unauthenticated);
        assert!(!config.trust_forwarded_for);
    }

    #[test]
    fn test_with_secret_keeps_limits() {
        let config = TokenConfig::with_secret("x".repeat(40));
        assert_eq!(config.jwt_secret.as_deref().map(str::len), Some(40));
        assert_eq!(config.lockout_duration, Duration::from_secs(900));
    }

    #[test]
    fn test_override_parsed_ignores_garbage() {
        std::env::set_var("HASS_BRIDGE_TEST_GARBAGE", "not-a-number");
        let mut value = 7usize;
        override_parsed("HASS_BRIDGE_TEST_GARBAGE", &mut value);
        assert_eq!(value, 7);

        std::env::set_var("HASS_BRIDGE_TEST_GARBAGE", " 12 ");
        override_parsed("HASS_BRIDGE_TEST_GARBAGE", &mut value);
        assert_eq!(value, 12);
        std::env::remove_var("HASS_BRIDGE_TEST_GARBAGE");
    }
}
