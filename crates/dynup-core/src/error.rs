//! Error types for the dynup system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dynup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dynup system
#[derive(Error, Debug)]
pub enum Error {
    /// A configured network interface does not exist on this host
    #[error("Interface unavailable: {0}")]
    InterfaceUnavailable(String),

    /// Address resolution produced no usable addresses
    #[error("No addresses found on the configured interfaces")]
    NoAddressesFound,

    /// The external address lookup failed at startup
    #[error("External address unavailable: {0}")]
    ExternalAddressUnavailable(String),

    /// An address-family token in the configuration is not recognized
    #[error("Invalid address family: {0}")]
    InvalidAddressFamily(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider client could not be constructed
    #[error("Provider setup error: {0}")]
    ProviderSetup(String),

    /// The provider accepted the request but refused the operation
    #[error("Provider rejected {command}: {detail}")]
    ProviderRejected {
        /// API command that was refused
        command: String,
        /// Provider-reported detail
        detail: String,
    },

    /// Transport-level failure talking to the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// I/O errors (state file, pid file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an interface-unavailable error
    pub fn interface_unavailable(name: impl Into<String>) -> Self {
        Self::InterfaceUnavailable(name.into())
    }

    /// Create an external-address error
    pub fn external_address(msg: impl Into<String>) -> Self {
        Self::ExternalAddressUnavailable(msg.into())
    }

    /// Create an invalid address-family error
    pub fn invalid_family(token: impl Into<String>) -> Self {
        Self::InvalidAddressFamily(token.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider setup error
    pub fn provider_setup(msg: impl Into<String>) -> Self {
        Self::ProviderSetup(msg.into())
    }

    /// Create a provider-rejection error
    pub fn rejected(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ProviderRejected {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Whether this error should stop the process rather than the
    /// current reconciliation pass.
    ///
    /// Provider rejections and transport failures are expected operational
    /// noise: the pass (or the remainder of it) is skipped and the poll
    /// loop keeps running. Everything else means the process is
    /// misconfigured or has lost a collaborator it cannot work without.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ProviderRejected { .. } | Self::Transport(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
