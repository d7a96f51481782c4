//! Error types for the extract, resolve and export stages.

use std::path::PathBuf;

/// Errors produced while reading a catalog, resolving service ids or
/// writing the export.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The catalog document is missing or not well-formed XML.
    #[error("failed to parse catalog {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// An element the walk depends on lacks a required attribute.
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    /// The service id for a connection string could not be obtained.
    #[error("failed to resolve service id for {connection_string}: {cause}")]
    Resolution {
        connection_string: String,
        #[source]
        cause: ResolveCause,
    },

    /// Writing the export failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport settings could not be turned into an HTTP client.
    #[error("invalid transport configuration: {0}")]
    Config(String),
}

/// Underlying reason a service lookup failed.
#[derive(Debug, thiserror::Error)]
pub enum ResolveCause {
    #[error("cannot build metadata url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    #[error("response is not valid JSON: {0}")]
    Body(#[from] serde_json::Error),

    #[error("response has no 'serviceItemId'")]
    MissingKey,

    #[error("'serviceItemId' is not a string or number: {0}")]
    UnsupportedValue(String),
}

impl Error {
    /// Wrap a lookup failure with the connection string it belongs to.
    pub fn resolution(connection_string: &str, cause: impl Into<ResolveCause>) -> Self {
        Error::Resolution {
            connection_string: connection_string.to_string(),
            cause: cause.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
