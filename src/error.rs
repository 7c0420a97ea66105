//! Error types shared by the registry, the runners and the fetchers.

use thiserror::Error;

/// Errors produced while building providers or running scrapes.
///
/// Runners treat [`ScrapeError::NotFound`] and [`ScrapeError::Failure`] as
/// per-provider outcomes and keep going. Only [`ScrapeError::Configuration`]
/// and [`ScrapeError::Aborted`] escape an orchestrated run.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Caller mistake: duplicate ids/ranks, unknown provider, media mismatch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The provider legitimately has nothing for this request.
    #[error("Couldn't find a stream: {0}")]
    NotFound(String),

    /// The run was cancelled between providers.
    #[error("scrape aborted")]
    Aborted,

    /// Anything else a provider (or its network calls) threw.
    #[error(transparent)]
    Failure(#[from] anyhow::Error),
}

impl ScrapeError {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound(reason.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// `true` for the expected "nothing usable here" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<FetchError> for ScrapeError {
    fn from(err: FetchError) -> Self {
        Self::Failure(anyhow::Error::new(err))
    }
}

/// Errors raised by [`Fetcher`](crate::fetch::Fetcher) implementations.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} timed out after {ms}ms")]
    Timeout { url: String, ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header: {0}")]
    Header(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
