//! Error types shared by the loader, resolver and request executor.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    #[error("unresolved reference {reference}: {reason}")]
    UnresolvedRef { reference: String, reason: String },

    #[error("recursive reference {reference}")]
    RecursiveRef { reference: String },

    #[error("{} environment variables are required (missing: {})", .required.join(" and "), .missing.join(", "))]
    MissingConfig {
        required: Vec<&'static str>,
        missing: Vec<&'static str>,
    },

    #[error("Endpoint not found: {path}")]
    EndpointNotFound { path: String },

    #[error("Method not supported: {method} {path}")]
    MethodNotSupported { method: String, path: String },

    #[error("invalid HTTP method: {method}")]
    InvalidMethod { method: String },

    #[error("invalid value for header {name}")]
    InvalidHeader { name: String },

    #[error("HTTP request failed: {message}")]
    Transport { message: String },

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },
}
