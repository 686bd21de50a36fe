//! Builds and sends an authenticated request for one API operation.

use std::fs;
use std::path::Path;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info};

use crate::censor::Censor;
use crate::config::RequestConfig;
use crate::error::{Error, Result};
use crate::media;
use crate::spec::{Operation, Spec};

pub const DEFAULT_METHOD: &str = "get";

/// Request body as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Bytes(Vec<u8>),
}

impl Body {
    /// `@path` reads the file's bytes; anything else is sent as-is.
    pub fn from_arg(value: &str) -> Result<Self> {
        match value.strip_prefix('@') {
            Some(path) => fs::read(path).map(Body::Bytes).map_err(|source| Error::Io {
                path: Path::new(path).to_path_buf(),
                source,
            }),
            None => Ok(Body::Text(value.to_string())),
        }
    }
}

/// Caller overrides for a request; unset headers are inferred from the operation.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: String,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Body>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            accept: None,
            content_type: None,
            body: None,
        }
    }
}

#[derive(Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

#[derive(Debug)]
pub struct ApiResponse {
    pub content_type: String,
    pub body: Vec<u8>,
}

pub struct RequestExecutor {
    config: RequestConfig,
    censor: Censor,
    client: Client,
}

impl RequestExecutor {
    pub fn new(config: RequestConfig) -> Result<Self> {
        // A request waits for the server as long as it takes.
        let client = Client::builder()
            .user_agent(concat!("openapi-helper/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()
            .map_err(|err| Error::Transport {
                message: error_chain(&err),
            })?;
        Ok(Self {
            censor: Censor::new(&config),
            config,
            client,
        })
    }

    /// Resolve `path` and `options.method` against the document and build the
    /// request without sending it.
    pub fn prepare(&self, spec: &Spec, path: &str, options: RequestOptions) -> Result<PreparedRequest> {
        prepare(spec, &self.config, path, options)
    }

    /// Send a prepared request. Error statuses (4xx/5xx) become
    /// [`Error::HttpStatus`] with the URL and body censored.
    pub fn send(&self, request: PreparedRequest) -> Result<ApiResponse> {
        info!(method = %request.method, url = %self.censor.text(&request.url), "sending request");

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        builder = match request.body {
            Some(Body::Text(text)) => builder.body(text),
            Some(Body::Bytes(bytes)) => builder.body(bytes),
            None => builder,
        };

        let response = builder.send().map_err(|err| self.transport(err))?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().map_err(|err| self.transport(err))?.to_vec();
        debug!(status = status.as_u16(), content_type = %content_type, bytes = body.len(), "received response");

        if status.is_client_error() || status.is_server_error() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: self.censor.text(&request.url),
                body: self.censor.text(&String::from_utf8_lossy(&body)),
            });
        }

        Ok(ApiResponse {
            content_type,
            body,
        })
    }

    /// Prepare, send and render in one step.
    pub fn execute(&self, spec: &Spec, path: &str, options: RequestOptions) -> Result<Vec<u8>> {
        let request = self.prepare(spec, path, options)?;
        let response = self.send(request)?;
        self.render(&response)
    }

    /// Bytes to print: re-indented JSON for JSON responses, the raw body
    /// otherwise. Both are censored.
    pub fn render(&self, response: &ApiResponse) -> Result<Vec<u8>> {
        if !response.content_type.contains("json") {
            return Ok(self.censor.bytes(&response.body));
        }
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let value: serde_json::Value =
            serde_json::from_slice(&response.body).map_err(|err| Error::Transport {
                message: format!("invalid JSON response: {err}"),
            })?;
        let pretty = serde_json::to_string_pretty(&value).map_err(|err| Error::Transport {
            message: err.to_string(),
        })?;
        let mut rendered = self.censor.text(&pretty).into_bytes();
        rendered.push(b'\n');
        Ok(rendered)
    }

    fn transport(&self, err: reqwest::Error) -> Error {
        Error::Transport {
            message: self.censor.text(&error_chain(&err)),
        }
    }
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Header and URL resolution for one operation, independent of any client.
pub fn prepare(
    spec: &Spec,
    config: &RequestConfig,
    path: &str,
    options: RequestOptions,
) -> Result<PreparedRequest> {
    let (template, item) = spec.match_path(path).ok_or_else(|| Error::EndpointNotFound {
        path: path.to_string(),
    })?;
    let method_key = options.method.to_lowercase();
    let operation = item
        .operation(&method_key)
        .ok_or_else(|| Error::MethodNotSupported {
            method: options.method.to_uppercase(),
            path: path.to_string(),
        })?;
    debug!(path, template, method = %method_key, "matched operation");

    let method = Method::from_bytes(method_key.to_uppercase().as_bytes()).map_err(|_| {
        Error::InvalidMethod {
            method: options.method.clone(),
        }
    })?;

    let accept = options.accept.or_else(|| infer_accept(spec, operation));
    let content_type = options
        .content_type
        .or_else(|| infer_content_type(spec, operation));

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        header_value(AUTHORIZATION, &format!("Bearer {}", config.access_token()))?,
    );
    if let Some(accept) = accept {
        headers.insert(ACCEPT, header_value(ACCEPT, &accept)?);
    }
    if let Some(content_type) = content_type {
        if sends_body(&method) {
            headers.insert(CONTENT_TYPE, header_value(CONTENT_TYPE, &content_type)?);
        }
    }

    Ok(PreparedRequest {
        method,
        url: config.endpoint_url(path),
        headers,
        body: options.body,
    })
}

/// Preferred media type of the lowest 2xx response, falling back to the
/// Swagger 2.0 `produces` lists when that response declares no `content`.
pub fn infer_accept(spec: &Spec, operation: &Operation) -> Option<String> {
    let mut codes: Vec<&String> = operation.responses.keys().collect();
    codes.sort();
    let declared = codes
        .into_iter()
        .find(|code| code.starts_with('2'))
        .and_then(|code| operation.responses[code.as_str()].content.as_ref());

    match declared {
        Some(content) => media::preferred(content),
        None => swagger_fallback(&operation.produces, &spec.produces),
    }
    .map(str::to_string)
}

/// Preferred media type of the request body, or of `consumes` for Swagger
/// 2.0 body parameters. `None` when the operation takes no body.
pub fn infer_content_type(spec: &Spec, operation: &Operation) -> Option<String> {
    if !operation.has_request_body() {
        return None;
    }
    let declared = operation
        .request_body
        .as_ref()
        .and_then(|body| body.content.as_ref());

    match declared {
        Some(content) => media::preferred(content),
        None => swagger_fallback(&operation.consumes, &spec.consumes),
    }
    .map(str::to_string)
}

fn swagger_fallback<'a>(operation: &'a [String], document: &'a [String]) -> Option<&'a str> {
    let types = if operation.is_empty() { document } else { operation };
    media::preferred_of(types.iter().map(String::as_str))
}

fn sends_body(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH].contains(method)
}

fn header_value(name: HeaderName, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
        name: name.to_string(),
    })
}
