//! List, inspect and call the endpoints of a local OpenAPI/Swagger document.
//!
//! The library holds the shared core; `openapi-helper` and `openapi-request`
//! are two configurations of it. The first reads a plain JSON document and lists
//! or inspects endpoints. The second reads a YAML document with `$ref`s resolved
//! and can also send an authenticated request, censoring the base URL and
//! token out of what it prints.

pub mod censor;
pub mod cli;
pub mod config;
pub mod error;
pub mod listing;
pub mod media;
pub mod request;
pub mod resolver;
pub mod spec;

pub use censor::Censor;
pub use config::RequestConfig;
pub use error::{Error, Result};
pub use request::{Body, RequestExecutor, RequestOptions};
pub use spec::{Format, Operation, PathItem, Spec};
