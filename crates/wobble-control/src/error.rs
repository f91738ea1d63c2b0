//! Error types for broker delivery
use thiserror::Error;
use wobble_core::CoreError;

/// Delivery errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// Broker could not be reached or dropped the connection mid-batch
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// Event could not be encoded for the wire
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Broker answered with something other than what the protocol expects
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Event assembly or configuration failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for delivery operations
pub type Result<T> = std::result::Result<T, ControlError>;
