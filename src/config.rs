//! Runtime request context: where to send requests and how to authenticate.

use std::env;

use crate::error::{Error, Result};

pub const BASE_URL_VAR: &str = "BASE_URL";
pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    base_url: String,
    access_token: String,
}

impl RequestConfig {
    /// Both values must be present and non-empty; otherwise the error names
    /// every missing one.
    pub fn from_parts(base_url: Option<String>, access_token: Option<String>) -> Result<Self> {
        let base_url = base_url.filter(|value| !value.is_empty());
        let access_token = access_token.filter(|value| !value.is_empty());

        match (base_url, access_token) {
            (Some(base_url), Some(access_token)) => Ok(Self {
                base_url,
                access_token,
            }),
            (base_url, access_token) => {
                let mut missing = Vec::new();
                if base_url.is_none() {
                    missing.push(BASE_URL_VAR);
                }
                if access_token.is_none() {
                    missing.push(ACCESS_TOKEN_VAR);
                }
                Err(Error::MissingConfig {
                    required: vec![BASE_URL_VAR, ACCESS_TOKEN_VAR],
                    missing,
                })
            }
        }
    }

    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::from_parts(Some(base_url.into()), Some(access_token.into()))
    }

    /// Explicit values win; anything not given is read from `BASE_URL` and
    /// `ACCESS_TOKEN`.
    pub fn from_env_with_overrides(
        base_url: Option<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        Self::from_parts(
            base_url.or_else(|| env::var(BASE_URL_VAR).ok()),
            access_token.or_else(|| env::var(ACCESS_TOKEN_VAR).ok()),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// `{base_url}/api{path}` with any trailing slash on the base removed.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
    }
}
