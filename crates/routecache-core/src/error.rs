//! Error types for route subscriptions.
//!
//! Only registration and construction can fail. Dispatch anomalies
//! (an address nobody listens to, a generic address reaching a literal
//! subscriber) are logged and never surface as errors.

use thiserror::Error;

use crate::registry::SubscriberId;

/// Errors raised while configuring a channel or registering subscriptions.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A group pattern contains both the parameter prefix and the glob character.
    #[error(
        "pattern '{pattern}' mixes the parameter prefix '{param_prefix}' with the glob character '{glob}'"
    )]
    MixedPattern {
        /// The rejected pattern
        pattern: String,
        /// Configured parameter prefix
        param_prefix: char,
        /// Configured glob character
        glob: char,
    },

    /// The delimiter, parameter prefix and glob characters are not usable together.
    #[error("invalid route syntax: {0}")]
    InvalidSyntax(String),

    /// A subscription referenced a handle that was never registered.
    #[error("unknown subscriber: {0}")]
    UnknownSubscriber(SubscriberId),
}

impl RouteError {
    /// Creates an InvalidSyntax error.
    pub fn invalid_syntax(reason: impl Into<String>) -> Self {
        Self::InvalidSyntax(reason.into())
    }

    /// Returns true if this error was caused by configuration rather than usage.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::MixedPattern { .. } | Self::InvalidSyntax(_))
    }
}

/// Type alias for Results with RouteError.
pub type Result<T> = std::result::Result<T, RouteError>;
