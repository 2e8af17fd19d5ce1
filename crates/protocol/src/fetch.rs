use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::Body;

/// Header map flattened to plain `name → value` pairs.
///
/// Names are kept exactly as the browser reports them (lowercase for
/// `Headers.entries()`); a `BTreeMap` keeps the wire form deterministic.
pub type Headers = BTreeMap<String, String>;

/// Everything needed to reproduce a `fetch()` call in another context.
///
/// Only plain data lives here. A cancellation token has no wire form and
/// is never part of the options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive: Option<bool>,
}

fn default_method() -> String {
    "GET".to_owned()
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: default_method(),
            headers: Headers::new(),
            body: None,
            mode: None,
            credentials: None,
            cache: None,
            redirect: None,
            referrer: None,
            referrer_policy: None,
            integrity: None,
            keepalive: None,
        }
    }
}

/// A slave's request, shipped to the master for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Correlation id pairing this request with its answer.
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub options: FetchOptions,
}

/// The master's answer to a [`FetchRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Body,
    /// Final URL after redirects.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub response_type: ResponseType,
    #[serde(default)]
    pub redirected: bool,
}

impl FetchResponse {
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Mirrors the browser's `Response.type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Basic,
    Cors,
    Default,
    Error,
    Opaque,
    #[serde(rename = "opaqueredirect")]
    OpaqueRedirect,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Cors => "cors",
            Self::Default => "default",
            Self::Error => "error",
            Self::Opaque => "opaque",
            Self::OpaqueRedirect => "opaqueredirect",
        }
    }
}
