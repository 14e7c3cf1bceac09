//! Error types for transport operations

use std::fmt;

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while handing events to a transport
#[derive(Debug)]
pub enum TransportError {
    /// The transport is not connected
    NotConnected,

    /// The receiving side refused the event
    Rejected(String),

    /// The request could not be sent
    RequestFailed(String),

    /// Invalid transport configuration
    InvalidConfig(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "transport is not connected"),
            TransportError::Rejected(msg) => write!(f, "event rejected: {}", msg),
            TransportError::RequestFailed(msg) => write!(f, "failed to send event: {}", msg),
            TransportError::InvalidConfig(msg) => {
                write!(f, "invalid transport configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::RequestFailed(err.to_string())
    }
}
