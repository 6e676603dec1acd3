//! Error types for Setu

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Setu error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Status code returned by the service
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed inbound message or service response
    #[error("Decode error: {0}")]
    Decode(String),

    /// A bounded collection would overflow
    #[error("Too many {what} (max {max})")]
    CapacityExceeded {
        /// Collection name
        what: &'static str,
        /// Capacity ceiling
        max: usize,
    },

    /// Mission already in flight
    #[error("Robot is busy")]
    Busy,

    /// Camera capture failed
    #[error("Camera error: {0}")]
    Camera(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
