//! Error handling for the chat relay

use std::fmt;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Relay error types
#[derive(Debug, Clone)]
pub enum RelayError {
    /// Network-related errors
    Network(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Protocol errors (unexpected or malformed frames)
    Protocol(String),
    /// Connection errors
    Connection(String),
    /// Credential store errors (persistence unreachable or corrupt)
    Store(String),
    /// Server internal error
    Internal(String),
    /// Configuration error
    Config(String),
    /// Timeout error
    Timeout(String),
    /// Resource limit exceeded
    ResourceLimit(String),
}

impl RelayError {
    /// Get error code for this error type
    pub fn code(&self) -> u32 {
        match self {
            RelayError::Network(_) => 1000,
            RelayError::Serialization(_) => 1001,
            RelayError::Protocol(_) => 1002,
            RelayError::Connection(_) => 1003,
            RelayError::Store(_) => 1004,
            RelayError::Internal(_) => 1005,
            RelayError::Config(_) => 1006,
            RelayError::Timeout(_) => 1007,
            RelayError::ResourceLimit(_) => 1008,
        }
    }

    /// Get human-readable error message
    pub fn message(&self) -> &str {
        match self {
            RelayError::Network(msg) => msg,
            RelayError::Serialization(msg) => msg,
            RelayError::Protocol(msg) => msg,
            RelayError::Connection(msg) => msg,
            RelayError::Store(msg) => msg,
            RelayError::Internal(msg) => msg,
            RelayError::Config(msg) => msg,
            RelayError::Timeout(msg) => msg,
            RelayError::ResourceLimit(msg) => msg,
        }
    }

    /// Create a network error
    pub fn network<T: Into<String>>(msg: T) -> Self {
        RelayError::Network(msg.into())
    }

    /// Create a serialization error
    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        RelayError::Serialization(msg.into())
    }

    /// Create a protocol error
    pub fn protocol<T: Into<String>>(msg: T) -> Self {
        RelayError::Protocol(msg.into())
    }

    /// Create a connection error
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        RelayError::Connection(msg.into())
    }

    /// Create a credential store error
    pub fn store<T: Into<String>>(msg: T) -> Self {
        RelayError::Store(msg.into())
    }

    /// Create an internal error
    pub fn internal<T: Into<String>>(msg: T) -> Self {
        RelayError::Internal(msg.into())
    }

    /// Create a configuration error
    pub fn config<T: Into<String>>(msg: T) -> Self {
        RelayError::Config(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        RelayError::Timeout(msg.into())
    }

    /// Create a resource limit error
    pub fn resource_limit<T: Into<String>>(msg: T) -> Self {
        RelayError::ResourceLimit(msg.into())
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Network(msg) => write!(f, "Network error: {}", msg),
            RelayError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            RelayError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            RelayError::Connection(msg) => write!(f, "Connection error: {}", msg),
            RelayError::Store(msg) => write!(f, "Store error: {}", msg),
            RelayError::Internal(msg) => write!(f, "Internal error: {}", msg),
            RelayError::Config(msg) => write!(f, "Configuration error: {}", msg),
            RelayError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            RelayError::ResourceLimit(msg) => write!(f, "Resource limit exceeded: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Network(format!("IO error: {}", err))
    }
}

impl From<quinn::ConnectError> for RelayError {
    fn from(err: quinn::ConnectError) -> Self {
        RelayError::Connection(format!("QUIC connection error: {}", err))
    }
}

impl From<quinn::ConnectionError> for RelayError {
    fn from(err: quinn::ConnectionError) -> Self {
        RelayError::Connection(format!("QUIC connection error: {}", err))
    }
}

impl From<quinn::ReadError> for RelayError {
    fn from(err: quinn::ReadError) -> Self {
        RelayError::Network(format!("QUIC read error: {}", err))
    }
}

impl From<quinn::WriteError> for RelayError {
    fn from(err: quinn::WriteError) -> Self {
        RelayError::Network(format!("QUIC write error: {}", err))
    }
}

impl From<quinn::ClosedStream> for RelayError {
    fn from(err: quinn::ClosedStream) -> Self {
        RelayError::Connection(format!("Stream closed: {}", err))
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        RelayError::Internal(format!("Anyhow error: {}", err))
    }
}
