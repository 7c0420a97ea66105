//! The injected HTTP capability.
//!
//! The engine never talks HTTP itself. Providers and the stream validator go
//! through a [`Fetcher`]; the crate ships reqwest-backed implementations in
//! [`crate::http_client`] but any implementation will do.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::FetchError;

/// Request body, serialized by [`FetchBody::serialize`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchBody {
    Text(String),
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl FetchBody {
    /// Content type to send (if any) and the encoded body.
    #[must_use]
    pub fn serialize(&self) -> (Option<&'static str>, String) {
        match self {
            FetchBody::Text(s) => (None, s.clone()),
            FetchBody::Json(v) => (Some("application/json"), v.to_string()),
            FetchBody::Form(pairs) => {
                let encoded = pairs
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&");
                (Some("application/x-www-form-urlencoded"), encoded)
            }
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<FetchBody>,
    /// Joined in front of relative request URLs.
    pub base_url: Option<String>,
    /// Response headers to copy into [`FetchResponse::headers`].
    pub read_headers: Vec<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: None,
            base_url: None,
            read_headers: Vec::new(),
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status_code: u16,
    pub body: String,
    pub final_url: String,
    pub headers: BTreeMap<String, String>,
}

impl FetchResponse {
    /// Status in `[200, 400)`.
    #[must_use]
    pub fn is_ok_status(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// A way to make HTTP requests on behalf of providers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, ops: FetchOptions) -> Result<FetchResponse, FetchError>;

    /// Fetch and return only the body.
    async fn fetch_text(&self, url: &str, ops: FetchOptions) -> Result<String, FetchError> {
        Ok(self.fetch(url, ops).await?.body)
    }
}

/// Join `base_url` and `url`, check the scheme and apply `query`.
///
/// Query parameters replace existing ones with the same name.
pub fn make_full_url(url: &str, ops: &FetchOptions) -> Result<Url, FetchError> {
    let mut left = ops.base_url.clone().unwrap_or_default();
    let mut right = url;
    if !left.is_empty() && !left.ends_with('/') {
        left.push('/');
    }
    if let Some(stripped) = right.strip_prefix('/') {
        if !left.is_empty() {
            right = stripped;
        }
    }
    let full = format!("{left}{right}");

    if !(full.starts_with("http://") || full.starts_with("https://") || full.starts_with("data:")) {
        return Err(FetchError::InvalidUrl {
            url: full,
            reason: "URL doesn't start with a http scheme".into(),
        });
    }

    let mut parsed = Url::parse(&full).map_err(|e| FetchError::InvalidUrl {
        url: full.clone(),
        reason: e.to_string(),
    })?;

    if !ops.query.is_empty() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| !ops.query.contains_key(k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        {
            let mut pairs = parsed.query_pairs_mut();
            pairs.clear();
            for (k, v) in &kept {
                pairs.append_pair(k, v);
            }
            for (k, v) in &ops.query {
                pairs.append_pair(k, v);
            }
        }
    }

    Ok(parsed)
}
