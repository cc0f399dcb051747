//! Error types for release verification.
//!
//! Two layers:
//! - [`ReleaseError`]: fatal configuration errors that abort a run before
//!   any check starts.
//! - [`ApiError`]: a single failed remote call. Checks never propagate
//!   these; they are recorded as `failed-check` validation errors instead.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors: no meaningful verification can proceed without valid input.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// A configuration or manifest file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration or manifest file is not valid YAML for its schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The manifest uses a dependency shape this tool does not accept.
    #[error("unsupported manifest entry '{dependency}': {reason}")]
    UnsupportedManifest { dependency: String, reason: String },

    /// A required setting is absent from both the environment and the config file.
    #[error(
        "missing required setting '{key}': define {env_var} in the environment or '{key}' in config.yml"
    )]
    MissingSetting { key: String, env_var: String },

    /// An HTTP client could not be constructed.
    #[error("failed to build {service} client: {detail}")]
    Client { service: String, detail: String },

    /// The error log file could not be created.
    #[error("failed to create error log {path}: {source}")]
    ErrorLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for fatal release operations.
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// A failed call to the source-hosting or CI API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// The resource does not exist.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// The server answered with a status other than 2xx or 404.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response body from {url}: {detail}")]
    Decode { url: String, detail: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

/// Result type for remote API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
