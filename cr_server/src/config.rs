//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use card_rooms::{RoomConfig, session::DEFAULT_CHANNEL_CAPACITY};
use std::{
    net::{Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};

/// Default bind address when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(Ipv4Addr::LOCALHOST),
    6969,
);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Security configuration
    pub security: SecurityConfig,
    /// Settings every new room starts with
    pub room_defaults: RoomConfig,
    /// Outbound queue depth per connection
    pub session_channel_capacity: usize,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT verification secret (required)
    pub jwt_secret: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `rounds_override` - Optional trick-bidding round count (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        rounds_override: Option<u32>,
    ) -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok(), bind_override, rounds_override)
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(
        lookup: F,
        bind_override: Option<SocketAddr>,
        rounds_override: Option<u32>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Bind address
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_var(&lookup, "SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        // Security configuration (REQUIRED)
        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        // Room defaults
        let defaults = RoomConfig::default();
        let total_rounds = match rounds_override {
            Some(rounds) => rounds,
            None => parse_var(&lookup, "ROOM_TOTAL_ROUNDS")?.unwrap_or(defaults.total_rounds),
        };
        let turn_timeout = parse_var::<u64, _>(&lookup, "ROOM_TURN_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let room_defaults = RoomConfig {
            total_rounds,
            target_score: parse_var(&lookup, "ROOM_TARGET_SCORE")?
                .unwrap_or(defaults.target_score),
            trick_points: parse_var(&lookup, "ROOM_TRICK_POINTS")?
                .unwrap_or(defaults.trick_points),
            enforce_follow_suit: parse_var(&lookup, "ROOM_ENFORCE_FOLLOW_SUIT")?
                .unwrap_or(defaults.enforce_follow_suit),
            turn_timeout,
            ..defaults
        };

        let config = Self {
            bind,
            security: SecurityConfig { jwt_secret },
            room_defaults,
            session_channel_capacity: parse_var(&lookup, "SESSION_CHANNEL_CAPACITY")?
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY),
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "SESSION_CHANNEL_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        self.room_defaults
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "ROOM_*".to_string(),
                reason,
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an optional variable. Present but unparsable values are errors.
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("Cannot parse {raw:?}"),
            }),
    }
}
