//! Driving providers to a playable stream.
//!
//! # Strategies
//!
//! - [`individual`]: run one named source or embed, probe everything it returns
//! - [`fallback`]: walk sources in order, descending into embeds, probe the
//!   first candidate of each and stop at the first that plays
//! - [`race`]: scrape the top sources concurrently and take the first with a
//!   valid stream, unprobed, within a shared deadline
//!
//! All three share the scrape-then-filter steps defined here.

pub mod fallback;
pub mod individual;
pub mod race;

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::context::Fetchers;
use crate::error::Result;
use crate::events::EventSink;
use crate::features::FeatureSet;
use crate::media::ScrapeMedia;
use crate::provider::{Embed, EmbedOutput, EmbedRef, Source, SourcererOutput};
use crate::registry::Registry;
use crate::stream::Stream;
use crate::validate::{is_valid_stream, ValidationConfig};

pub use fallback::run_all;
pub use individual::{run_embed, run_source};
pub use race::run_all_fast;

pub const DEFAULT_RACE_TOP_N: usize = 5;
pub const DEFAULT_RACE_TIMEOUT: Duration = Duration::from_secs(20);

/// The winning provider and its stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_id: Option<String>,
    pub stream: Stream,
}

/// Settings fixed for the lifetime of a provider set.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub fetchers: Fetchers,
    /// Drop every non-HLS stream before validation.
    pub prefer_hls_only: bool,
    pub validation: ValidationConfig,
}

impl EngineOptions {
    pub fn new(fetchers: Fetchers) -> Self {
        Self {
            fetchers,
            prefer_hls_only: false,
            validation: ValidationConfig::default(),
        }
    }
}

/// Per-call inputs of [`run_all`] and [`run_all_fast`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub media: ScrapeMedia,
    /// Source ids to try first, in this order.
    pub source_order: Vec<String>,
    /// Embed ids to prefer when a source offers several.
    pub embed_order: Vec<String>,
    pub events: EventSink,
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn new(media: ScrapeMedia) -> Self {
        Self {
            media,
            source_order: Vec::new(),
            embed_order: Vec::new(),
            events: EventSink::none(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn source_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_order = order.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn embed_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.embed_order = order.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceOptions {
    /// How many of the ordered sources to launch.
    pub top_n: usize,
    /// Deadline for the whole race.
    pub timeout: Duration,
}

impl Default for RaceOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_RACE_TOP_N,
            timeout: DEFAULT_RACE_TIMEOUT,
        }
    }
}

/// Keep structurally valid streams the feature set allows.
pub(crate) fn filter_streams(
    streams: Vec<Stream>,
    features: &FeatureSet,
    prefer_hls_only: bool,
) -> Vec<Stream> {
    streams
        .into_iter()
        .filter(is_valid_stream)
        .filter(|s| features.allows(s.flags()))
        .filter(|s| !prefer_hls_only || s.is_hls())
        .collect()
}

/// Keep refs pointing at embeds the registry knows (and so are enabled).
pub(crate) fn filter_embed_refs(refs: Vec<EmbedRef>, registry: &Registry) -> Vec<EmbedRef> {
    refs.into_iter()
        .filter(|r| registry.embed(&r.embed_id).is_some())
        .collect()
}

/// Scrape a source and apply the stream and embed-ref filters.
pub(crate) async fn scrape_source(
    registry: &Registry,
    engine: &EngineOptions,
    source: &Source,
    media: &ScrapeMedia,
    events: &EventSink,
    progress_id: &str,
) -> Result<SourcererOutput> {
    let ctx = engine.fetchers.context(progress_id, events.clone());
    let output = source.scrape(&ctx, media).await?;
    Ok(SourcererOutput {
        streams: filter_streams(output.streams, registry.features(), engine.prefer_hls_only),
        embeds: filter_embed_refs(output.embeds, registry),
    })
}

/// Scrape an embed and apply the stream filters.
pub(crate) async fn scrape_embed(
    registry: &Registry,
    engine: &EngineOptions,
    embed: &Embed,
    url: &str,
    events: &EventSink,
    progress_id: &str,
) -> Result<EmbedOutput> {
    let ctx = engine.fetchers.context(progress_id, events.clone());
    let output = embed.scrape(&ctx, url).await?;
    Ok(EmbedOutput {
        streams: filter_streams(output.streams, registry.features(), engine.prefer_hls_only),
    })
}
