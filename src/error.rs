//! Error types for schema negotiation and wire encoding

use thiserror::Error;

use crate::schema::SchemaId;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Outcome of a failed registry round trip.
///
/// `NotFound` is a structured signal derived from the registry's status and
/// error code, never from message text.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("no schema registered for subject '{subject}'")]
    NotFound { subject: String },

    #[error("{operation} for subject '{subject}' failed in transport: {source}")]
    Transport {
        operation: &'static str,
        subject: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "{operation} for subject '{subject}' returned {status}{code}: {message}",
        code = .error_code.map(|c| format!(" (error code {})", c)).unwrap_or_default()
    )]
    Status {
        operation: &'static str,
        subject: String,
        status: u16,
        error_code: Option<u32>,
        message: String,
    },

    #[error("{operation} for subject '{subject}' returned an unreadable response: {reason}")]
    InvalidResponse {
        operation: &'static str,
        subject: String,
        reason: String,
    },

    #[error("{operation} for subject '{subject}' was cancelled")]
    Cancelled {
        operation: &'static str,
        subject: String,
    },
}

impl RegistryError {
    /// Whether the registry reported that the subject has no schema yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }

    /// Whether the failure happened below the HTTP layer
    pub fn is_transport(&self) -> bool {
        matches!(self, RegistryError::Transport { .. })
    }
}

/// Where a schema document came from, for parse error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecOrigin {
    /// Supplied by the caller of `ensure_schema`
    Local,
    /// Returned by the registry
    Registry,
}

impl std::fmt::Display for SpecOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecOrigin::Local => write!(f, "local"),
            SpecOrigin::Registry => write!(f, "registry"),
        }
    }
}

/// Schema negotiation and codec errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid subject: {0:?}")]
    InvalidSubject(String),

    #[error("Failed to parse {origin} schema for subject '{subject}': {reason}")]
    SpecParse {
        origin: SpecOrigin,
        subject: String,
        reason: String,
    },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Malformed envelope of {length} bytes: {reason}")]
    Format { length: usize, reason: String },

    #[error("Unknown schema id {id}")]
    UnknownSchema { id: SchemaId },

    #[error("Failed to encode value for subject '{subject}' with schema {id}: {reason}")]
    Encoding {
        subject: String,
        id: SchemaId,
        reason: String,
    },

    #[error("Failed to decode {length} byte payload with schema {id}: {reason}")]
    Decoding {
        id: SchemaId,
        length: usize,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Invalid registry url '{url}': {reason}")]
    InvalidRegistryUrl { url: String, reason: String },

    #[error("Failed to build registry HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl SchemaError {
    /// Whether this error carries a registry not-found outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaError::Registry(e) if e.is_not_found())
    }
}
