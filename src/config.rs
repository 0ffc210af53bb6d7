//! Engine configuration.
//!
//! Configuration is plain data deserialized from TOML. Every field has a
//! default so that an empty document yields a working engine.
//!
//! ```
//! use gigflow::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     commission_percent = 5
//!     external_call_timeout_ms = 2000
//!     administrators = ["ops-desk"]
//!
//!     [messaging]
//!     max_attachments = 4
//!     "#,
//! ).expect("valid configuration");
//!
//! assert_eq!(config.messaging.max_attachments, 4);
//! ```

use crate::message::domain::MessageLimits;
use crate::task::domain::{CommissionPercent, TaskDomainError, UserId};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is syntactically valid but unusable.
    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Settings for the task lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Platform commission in whole percent.
    pub commission_percent: u8,
    /// Upper bound for any single call to a remote collaborator.
    pub external_call_timeout_ms: u64,
    /// Maximum sibling applications rejected concurrently per batch.
    pub rejection_batch_size: usize,
    /// Users notified about every new posting.
    pub administrators: Vec<String>,
    /// Messaging channel limits.
    pub messaging: MessagingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commission_percent: CommissionPercent::STANDARD.value(),
            external_call_timeout_ms: 5_000,
            rejection_batch_size: 16,
            administrators: Vec::new(),
            messaging: MessagingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when a value fails validation.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a commission above 100 %, a zero
    /// timeout, a zero batch size, or a blank administrator id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.commission()
            .map_err(|err| invalid("commission_percent", &err))?;
        if self.external_call_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "external_call_timeout_ms",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.rejection_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "rejection_batch_size",
                reason: "must be greater than zero".to_owned(),
            });
        }
        self.administrator_ids()
            .map_err(|err| invalid("administrators", &err))?;
        self.messaging.validate()
    }

    /// Returns the validated commission rate.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidCommissionPercent`] above 100.
    pub const fn commission(&self) -> Result<CommissionPercent, TaskDomainError> {
        CommissionPercent::new(self.commission_percent)
    }

    /// Returns the external call bound as a [`Duration`].
    #[must_use]
    pub const fn external_call_timeout(&self) -> Duration {
        Duration::from_millis(self.external_call_timeout_ms)
    }

    /// Returns the validated administrator identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyUserId`] for a blank entry.
    pub fn administrator_ids(&self) -> Result<Vec<UserId>, TaskDomainError> {
        self.administrators
            .iter()
            .map(|id| UserId::new(id.as_str()))
            .collect()
    }
}

/// Limits applied to messages posted on a task channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessagingConfig {
    /// Maximum body length in characters.
    pub max_body_chars: usize,
    /// Maximum attachments per message.
    pub max_attachments: usize,
    /// Maximum size of one attachment in bytes.
    pub max_attachment_bytes: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        let limits = MessageLimits::default();
        Self {
            max_body_chars: limits.max_body_chars,
            max_attachments: limits.max_attachments,
            max_attachment_bytes: limits.max_attachment_bytes,
        }
    }
}

impl MessagingConfig {
    /// Returns the limits enforced by the messaging channel.
    #[must_use]
    pub const fn limits(&self) -> MessageLimits {
        MessageLimits {
            max_body_chars: self.max_body_chars,
            max_attachments: self.max_attachments,
            max_attachment_bytes: self.max_attachment_bytes,
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the body or attachment size limit
    /// is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "messaging.max_body_chars",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.max_attachment_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "messaging.max_attachment_bytes",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }
}

fn invalid(field: &'static str, err: &TaskDomainError) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: err.to_string(),
    }
}
