//! What a provider gets to work with during one scrape.

use std::sync::Arc;

use crate::events::{EventSink, UpdateEvent};
use crate::fetch::Fetcher;

/// The injected fetch capabilities, shared read-only by every provider.
#[derive(Clone)]
pub struct Fetchers {
    pub fetcher: Arc<dyn Fetcher>,
    pub proxied_fetcher: Arc<dyn Fetcher>,
    pub browser_fetcher: Option<Arc<dyn Fetcher>>,
}

impl Fetchers {
    /// Use `fetcher` for both direct and proxied requests.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            proxied_fetcher: Arc::clone(&fetcher),
            fetcher,
            browser_fetcher: None,
        }
    }

    #[must_use]
    pub fn with_proxied(mut self, proxied: Arc<dyn Fetcher>) -> Self {
        self.proxied_fetcher = proxied;
        self
    }

    #[must_use]
    pub fn with_browser(mut self, browser: Arc<dyn Fetcher>) -> Self {
        self.browser_fetcher = Some(browser);
        self
    }

    /// Context whose progress reports are attributed to `progress_id`.
    pub fn context(&self, progress_id: impl Into<String>, events: EventSink) -> ScrapeContext {
        ScrapeContext {
            fetcher: Arc::clone(&self.fetcher),
            proxied_fetcher: Arc::clone(&self.proxied_fetcher),
            browser_fetcher: self.browser_fetcher.clone(),
            progress_id: progress_id.into(),
            events,
        }
    }
}

impl std::fmt::Debug for Fetchers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetchers")
            .field("browser_fetcher", &self.browser_fetcher.is_some())
            .finish_non_exhaustive()
    }
}

/// Handed to a provider's `scrape`.
#[derive(Clone)]
pub struct ScrapeContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub proxied_fetcher: Arc<dyn Fetcher>,
    /// For sites that need a real browser (e.g. Cloudflare challenges).
    pub browser_fetcher: Option<Arc<dyn Fetcher>>,
    progress_id: String,
    events: EventSink,
}

impl ScrapeContext {
    /// Report scrape progress (0–100) as a `pending` update.
    pub fn progress(&self, percent: u8) {
        self.events
            .update(UpdateEvent::pending(self.progress_id.as_str(), percent));
    }

    #[must_use]
    pub fn progress_id(&self) -> &str {
        &self.progress_id
    }
}
