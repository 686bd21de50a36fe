//! Scrubs the base URL and access token out of anything shown to the user.

use crate::config::RequestConfig;

pub const BASE_URL_PLACEHOLDER: &str = "<BASE_URL>";
pub const ACCESS_TOKEN_PLACEHOLDER: &str = "<ACCESS_TOKEN>";

#[derive(Debug, Clone)]
pub struct Censor {
    // Longest secret first, so overlapping secrets resolve the same way
    // whatever order they were registered in.
    rules: Vec<(Vec<u8>, &'static str)>,
}

impl Censor {
    pub fn new(config: &RequestConfig) -> Self {
        Self::from_secrets([
            (config.base_url(), BASE_URL_PLACEHOLDER),
            (config.access_token(), ACCESS_TOKEN_PLACEHOLDER),
        ])
    }

    pub fn from_secrets<'a, I>(secrets: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'static str)>,
    {
        let mut rules: Vec<(Vec<u8>, &'static str)> = secrets
            .into_iter()
            .filter(|(secret, _)| !secret.is_empty())
            .map(|(secret, placeholder)| (secret.as_bytes().to_vec(), placeholder))
            .collect();
        rules.sort_by(|a, b| {
            b.0.len()
                .cmp(&a.0.len())
                .then_with(|| a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(b.1))
        });
        rules.dedup_by(|a, b| a.0 == b.0);
        Self { rules }
    }

    /// Single left-to-right pass; at each position the longest matching
    /// secret is replaced.
    pub fn bytes(&self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        let mut pos = 0;
        'scan: while pos < input.len() {
            for (secret, placeholder) in &self.rules {
                if input[pos..].starts_with(secret) {
                    out.extend_from_slice(placeholder.as_bytes());
                    pos += secret.len();
                    continue 'scan;
                }
            }
            out.push(input[pos]);
            pos += 1;
        }
        out
    }

    pub fn text(&self, input: &str) -> String {
        // Secrets are whole UTF-8 strings, so a match never splits a character.
        String::from_utf8_lossy(&self.bytes(input.as_bytes())).into_owned()
    }
}
