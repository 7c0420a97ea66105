//! reqwest-backed [`Fetcher`] implementations.
//!
//! - [`StandardFetcher`]: direct requests with a browser user agent
//! - [`ProxiedFetcher`]: routes through a proxy endpoint taking `?url=`
//! - [`SimpleProxyFetcher`]: routes through a proxy taking `?destination=`
//!   and `X-`-prefixed forwarding headers

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;
use crate::fetch::{make_full_url, FetchBody, FetchOptions, FetchResponse, Fetcher};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Whole-request budget for one fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Env var naming the `?url=` proxy endpoint.
pub const SCRAPER_PROXY_ENV: &str = "SCRAPER_PROXY";

/// Direct HTTP fetcher.
#[derive(Clone)]
pub struct StandardFetcher {
    client: Client,
    timeout: Duration,
}

impl StandardFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            // Let the server negotiate HTTP/2
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            timeout: DEFAULT_FETCH_TIMEOUT,
        })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a request to an already-resolved URL.
    ///
    /// The timeout covers the body read as well as the response head.
    #[instrument(skip(self, ops), fields(url = %url, method = %ops.method))]
    async fn send(&self, url: Url, ops: &FetchOptions) -> Result<FetchResponse, FetchError> {
        let mut req = self
            .client
            .request(ops.method.clone(), url.clone())
            .headers(request_headers(ops)?);
        if let Some(body) = &ops.body {
            req = req.body(body.serialize().1);
        }

        let exchange = async {
            let response = req.send().await?;
            debug!(status = %response.status(), "Response received");
            into_fetch_response(response, &ops.read_headers).await
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}

/// Default headers with the caller's set on top; a caller value replaces
/// the default of the same name.
fn request_headers(ops: &FetchOptions) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    if let Some((Some(content_type), _)) = ops.body.as_ref().map(FetchBody::serialize) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    for (k, v) in &ops.headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| FetchError::Header(format!("{k}: {e}")))?;
        let value =
            HeaderValue::from_str(v).map_err(|e| FetchError::Header(format!("{k}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

async fn into_fetch_response(
    response: Response,
    read_headers: &[String],
) -> Result<FetchResponse, FetchError> {
    let status_code = response.status().as_u16();
    let final_url = response.url().to_string();

    let mut headers = BTreeMap::new();
    for name in read_headers {
        let name = name.to_lowercase();
        if let Some(value) = response.headers().get(&name) {
            if let Ok(value) = value.to_str() {
                headers.insert(name, value.to_string());
            }
        }
    }

    let body = response.text().await?;
    Ok(FetchResponse {
        status_code,
        body,
        final_url,
        headers,
    })
}

#[async_trait]
impl Fetcher for StandardFetcher {
    async fn fetch(&self, url: &str, ops: FetchOptions) -> Result<FetchResponse, FetchError> {
        let full = make_full_url(url, &ops)?;
        self.send(full, &ops).await
    }
}

/// Ops for the outer proxy request: the target URL already carries the query.
fn forwarded_ops(ops: FetchOptions, proxy_query: BTreeMap<String, String>) -> FetchOptions {
    FetchOptions {
        query: proxy_query,
        base_url: None,
        ..ops
    }
}

/// Fetcher that sends every request through `<proxy>?url=<target>`.
///
/// Without a proxy URL it behaves exactly like [`StandardFetcher`].
#[derive(Clone)]
pub struct ProxiedFetcher {
    proxy: Option<Url>,
    inner: StandardFetcher,
}

impl ProxiedFetcher {
    #[must_use]
    pub fn new(proxy: Option<Url>, inner: StandardFetcher) -> Self {
        Self { proxy, inner }
    }

    /// Read the proxy endpoint from `SCRAPER_PROXY`.
    pub fn from_env(inner: StandardFetcher) -> Result<Self, FetchError> {
        let proxy = match std::env::var(SCRAPER_PROXY_ENV) {
            Ok(raw) if !raw.trim().is_empty() => {
                Some(Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl {
                    url: raw.clone(),
                    reason: e.to_string(),
                })?)
            }
            _ => None,
        };
        Ok(Self::new(proxy, inner))
    }
}

#[async_trait]
impl Fetcher for ProxiedFetcher {
    async fn fetch(&self, url: &str, ops: FetchOptions) -> Result<FetchResponse, FetchError> {
        let Some(proxy) = &self.proxy else {
            return self.inner.fetch(url, ops).await;
        };

        let target = make_full_url(url, &ops)?;
        let mut query = BTreeMap::new();
        query.insert("url".to_string(), target.to_string());
        let ops = forwarded_ops(ops, query);
        let full = make_full_url(proxy.as_str(), &ops)?;
        self.inner.send(full, &ops).await
    }
}

/// Headers a simple proxy would otherwise eat; forwarded under `X-` names.
const PROXY_HEADER_MAP: [(&str, &str); 5] = [
    ("cookie", "X-Cookie"),
    ("referer", "X-Referer"),
    ("origin", "X-Origin"),
    ("user-agent", "X-User-Agent"),
    ("x-real-ip", "X-X-Real-Ip"),
];

fn remap_proxy_headers(headers: BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .map(|(k, v)| {
            let lower = k.to_lowercase();
            match PROXY_HEADER_MAP.iter().find(|(from, _)| *from == lower) {
                Some((_, to)) => ((*to).to_string(), v),
                None => (k, v),
            }
        })
        .collect()
}

/// Fetcher for proxies taking `?destination=<target>`.
#[derive(Clone)]
pub struct SimpleProxyFetcher {
    proxy_url: String,
    inner: StandardFetcher,
}

impl SimpleProxyFetcher {
    pub fn new(proxy_url: impl Into<String>, inner: StandardFetcher) -> Self {
        Self {
            proxy_url: proxy_url.into(),
            inner,
        }
    }
}

#[async_trait]
impl Fetcher for SimpleProxyFetcher {
    async fn fetch(&self, url: &str, ops: FetchOptions) -> Result<FetchResponse, FetchError> {
        let target = make_full_url(url, &ops)?;
        let mut query = BTreeMap::new();
        query.insert("destination".to_string(), target.to_string());
        let mut ops = forwarded_ops(ops, query);
        ops.headers = remap_proxy_headers(std::mem::take(&mut ops.headers));
        let full = make_full_url(&self.proxy_url, &ops)?;
        self.inner.send(full, &ops).await
    }
}
