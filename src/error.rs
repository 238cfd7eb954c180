//! Error types for the dashboard renderer.

use thiserror::Error;

/// Errors that can occur while fetching, rendering or uploading a dashboard.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// A remote endpoint returned an error status code
    #[error("API returned error status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// A response did not have the expected shape
    #[error("Unexpected {source_name} format: {message}")]
    Schema {
        /// What was being parsed (e.g. "tagDB.json")
        source_name: String,
        /// Parser message
        message: String,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configured tag is not known to the access point
    #[error("Tag {0} not found in access point tag database")]
    UnknownTag(String),

    /// A tag references a hardware type the access point has no metadata for
    #[error("No display metadata for hardware type {0:#04X}")]
    UnknownHardwareType(u8),

    /// A single calendar event could not be interpreted
    #[error("Invalid calendar event: {0}")]
    Event(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Image encoding failed
    #[error("Image encoding failed: {0}")]
    Image(String),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Build a [`Error::Schema`] for the named source.
    pub fn schema(source_name: impl Into<String>, message: impl ToString) -> Self {
        Error::Schema {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Request(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}
