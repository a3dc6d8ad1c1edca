//! Runtime policy configuration for the marketplace engine.
//!
//! Every field has a default, so an empty TOML document yields the
//! production policy:
//!
//! ```toml
//! [cancellation]
//! free_cancellations = 3
//! fee_percent = 10
//! minimum_fee_cents = 100
//!
//! [side_effects]
//! max_attempts = 3
//! initial_backoff_ms = 25
//!
//! [settlement]
//! max_commit_attempts = 3
//! ```

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketplaceConfig {
    /// Cancellation fee policy.
    pub cancellation: CancellationPolicy,
    /// Retry policy for post-commit side effects.
    pub side_effects: RetryPolicy,
    /// Conditional-write tuning for task transitions.
    pub settlement: SettlementPolicy,
}

impl MarketplaceConfig {
    /// Parses and validates configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cancellation.fee_percent > 100 {
            return Err(ConfigError::Invalid {
                key: "cancellation.fee_percent",
                reason: "must not exceed 100",
            });
        }
        if self.cancellation.minimum_fee_cents < 0 {
            return Err(ConfigError::Invalid {
                key: "cancellation.minimum_fee_cents",
                reason: "must not be negative",
            });
        }
        if self.side_effects.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "side_effects.max_attempts",
                reason: "must be at least 1",
            });
        }
        if self.settlement.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "settlement.max_commit_attempts",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Fee policy applied to repeat cancellers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CancellationPolicy {
    /// Number of cancellations an actor may make before fees apply.
    pub free_cancellations: u32,
    /// Fee as a percentage of the task price.
    pub fee_percent: u32,
    /// Lower bound for a charged fee, in cents.
    pub minimum_fee_cents: i64,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            free_cancellations: 3,
            fee_percent: 10,
            minimum_fee_cents: 100,
        }
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later attempt.
    pub initial_backoff_ms: u64,
}

impl RetryPolicy {
    /// Returns the delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = 1_u64.checked_shl(exponent).unwrap_or(u64::MAX);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }

    /// Policy that performs exactly one attempt without waiting.
    #[must_use]
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 25,
        }
    }
}

/// Conditional-write tuning for task transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettlementPolicy {
    /// Attempts at committing a status change when a concurrent write
    /// invalidated the state it was validated against.
    pub max_commit_attempts: u32,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A value is outside its permitted range.
    #[error("invalid configuration value for {key}: {reason}")]
    Invalid {
        /// Dotted key path of the offending value.
        key: &'static str,
        /// Human-readable constraint.
        reason: &'static str,
    },
}
