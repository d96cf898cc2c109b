//! Error types for `opensqli-spec`.

use crate::loader::DocumentFormat;
use thiserror::Error;

/// Main error type for loading, resolving and querying API descriptions.
#[derive(Error, Debug)]
pub enum SpecError {
    /// The document could not be fetched (network failure, non-2xx status, unreadable file).
    #[error("Transport error: failed to fetch '{url}': {message}")]
    Transport { url: String, message: String },

    /// The document body is not valid for the detected format.
    #[error("Decode error: '{url}' is not valid {format}: {message}")]
    Decode {
        url: String,
        format: DocumentFormat,
        message: String,
    },

    /// A `$ref` points at a key or index that does not exist.
    #[error("Dangling reference '{reference}': no '{token}' in {document}")]
    DanglingReference {
        reference: String,
        document: String,
        token: String,
    },

    /// A `$ref` re-enters a target that is still being expanded.
    #[error("Circular reference '{reference}': {}", .chain.join(" -> "))]
    CircularReference {
        reference: String,
        chain: Vec<String>,
    },

    /// A `$ref` whose document part cannot be resolved against its base URL.
    #[error("Invalid reference '{reference}': {message}")]
    InvalidReference { reference: String, message: String },

    /// The root document declares neither `swagger` nor `openapi`.
    #[error("Unrecognized specification at '{url}': expected a 'swagger' or 'openapi' field")]
    UnrecognizedSpecification { url: String },

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Configuration errors (bad header, client construction).
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown path '{path}'")]
    UnknownPath { path: String },

    #[error("Unknown operation '{operation}' for path '{path}'")]
    UnknownOperation { path: String, operation: String },

    /// Query that the specification version has no concept of.
    #[error("{query} is not available for {version} documents")]
    Unsupported {
        version: &'static str,
        query: &'static str,
    },
}

/// Result type alias for specification operations.
pub type Result<T> = std::result::Result<T, SpecError>;
