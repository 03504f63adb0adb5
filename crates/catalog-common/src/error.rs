use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for catalog operations
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),
}

/// Configuration loading errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    #[diagnostic(code(config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", path.display())]
    #[diagnostic(code(config::parse))]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: {}", path.display())]
    #[diagnostic(
        code(config::format),
        help("Use a .toml or .json file")
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid configuration value for {field}: {message}")]
    #[diagnostic(code(config::invalid))]
    Invalid { field: &'static str, message: String },

    #[error("failed to parse URL: {url}")]
    #[diagnostic(code(config::url_parse))]
    UrlParse { url: String, message: String },
}

/// Errors from talking to the catalog API
#[derive(Debug, Error, Diagnostic)]
pub enum ApiError {
    #[error("not logged in or session expired")]
    #[diagnostic(
        code(api::unauthorized),
        help("Run `catalog login` to start a new session")
    )]
    Unauthorized,

    #[error("request failed with status {status}: {message}")]
    #[diagnostic(code(api::status))]
    Status { status: u16, message: String },

    #[error("unable to reach {url}")]
    #[diagnostic(code(api::network))]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {message}")]
    #[diagnostic(code(api::decode))]
    Decode { url: String, message: String },

    #[error("failed to build request: {message}")]
    #[diagnostic(code(api::request))]
    Request { message: String },
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Persisted admin session errors
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("failed to access session file {}", path.display())]
    #[diagnostic(code(session::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt session file {}", path.display())]
    #[diagnostic(
        code(session::corrupt),
        help("Delete the file and log in again")
    )]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("login response did not include a token")]
    #[diagnostic(code(session::missing_token))]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, CatalogError>;
