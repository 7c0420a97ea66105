//! Provider plugin contract.
//!
//! A [`Source`] turns a media descriptor into streams and/or references to
//! embeds; an [`Embed`] turns one URL into streams. Both wrap a trait object
//! holding the site-specific logic, which the engine treats as opaque.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ScrapeContext;
use crate::error::Result;
use crate::features::Flag;
use crate::media::{MediaKind, ScrapeMedia};
use crate::stream::Stream;

/// Pointer from a source to an embed that can resolve `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedRef {
    pub embed_id: String,
    pub url: String,
}

impl EmbedRef {
    pub fn new(embed_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            embed_id: embed_id.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcererOutput {
    #[serde(default, rename = "stream")]
    pub streams: Vec<Stream>,
    #[serde(default)]
    pub embeds: Vec<EmbedRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedOutput {
    #[serde(default, rename = "stream")]
    pub streams: Vec<Stream>,
}

/// Site-specific logic of a source.
#[async_trait]
pub trait SourceScraper: Send + Sync {
    async fn scrape(&self, ctx: &ScrapeContext, media: &ScrapeMedia) -> Result<SourcererOutput>;
}

/// Site-specific logic of an embed.
#[async_trait]
pub trait EmbedScraper: Send + Sync {
    async fn scrape(&self, ctx: &ScrapeContext, url: &str) -> Result<EmbedOutput>;
}

/// Anything ordered by id and rank.
pub trait Ranked {
    fn id(&self) -> &str;
    fn rank(&self) -> i32;
}

#[derive(Clone)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub rank: i32,
    pub flags: Vec<Flag>,
    pub disabled: bool,
    /// Only registered when explicitly opted in.
    pub external_source: bool,
    pub supports_movie: bool,
    pub supports_show: bool,
    scraper: Arc<dyn SourceScraper>,
}

impl Source {
    /// A source handling both movies and shows, with no flags.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rank: i32,
        scraper: Arc<dyn SourceScraper>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rank,
            flags: Vec::new(),
            disabled: false,
            external_source: false,
            supports_movie: true,
            supports_show: true,
            scraper,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = Flag>) -> Self {
        self.flags = flags.into_iter().collect();
        self
    }

    #[must_use]
    pub fn movies_only(mut self) -> Self {
        self.supports_movie = true;
        self.supports_show = false;
        self
    }

    #[must_use]
    pub fn shows_only(mut self) -> Self {
        self.supports_movie = false;
        self.supports_show = true;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    #[must_use]
    pub fn external(mut self) -> Self {
        self.external_source = true;
        self
    }

    #[must_use]
    pub fn supports(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Movie => self.supports_movie,
            MediaKind::Show => self.supports_show,
        }
    }

    #[must_use]
    pub fn media_kinds(&self) -> Vec<MediaKind> {
        [MediaKind::Movie, MediaKind::Show]
            .into_iter()
            .filter(|k| self.supports(*k))
            .collect()
    }

    pub async fn scrape(&self, ctx: &ScrapeContext, media: &ScrapeMedia) -> Result<SourcererOutput> {
        self.scraper.scrape(ctx, media).await
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id)
            .field("rank", &self.rank)
            .field("flags", &self.flags)
            .field("disabled", &self.disabled)
            .field("external_source", &self.external_source)
            .finish_non_exhaustive()
    }
}

impl Ranked for Source {
    fn id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> i32 {
        self.rank
    }
}

#[derive(Clone)]
pub struct Embed {
    pub id: String,
    pub name: String,
    pub rank: i32,
    pub flags: Vec<Flag>,
    pub disabled: bool,
    scraper: Arc<dyn EmbedScraper>,
}

impl Embed {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rank: i32,
        scraper: Arc<dyn EmbedScraper>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rank,
            flags: Vec::new(),
            disabled: false,
            scraper,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = Flag>) -> Self {
        self.flags = flags.into_iter().collect();
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub async fn scrape(&self, ctx: &ScrapeContext, url: &str) -> Result<EmbedOutput> {
        self.scraper.scrape(ctx, url).await
    }
}

impl fmt::Debug for Embed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embed")
            .field("id", &self.id)
            .field("rank", &self.rank)
            .field("flags", &self.flags)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl Ranked for Embed {
    fn id(&self) -> &str {
        &self.id
    }

    fn rank(&self) -> i32 {
        self.rank
    }
}

/// Either kind of provider.
#[derive(Debug, Clone)]
pub enum Provider {
    Source(Source),
    Embed(Embed),
}

impl Provider {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Provider::Source(s) => &s.name,
            Provider::Embed(e) => &e.name,
        }
    }

    #[must_use]
    pub fn metadata(&self) -> ProviderMetadata {
        match self {
            Provider::Source(s) => ProviderMetadata::from(s),
            Provider::Embed(e) => ProviderMetadata::from(e),
        }
    }
}

impl Ranked for Provider {
    fn id(&self) -> &str {
        match self {
            Provider::Source(s) => &s.id,
            Provider::Embed(e) => &e.id,
        }
    }

    fn rank(&self) -> i32 {
        match self {
            Provider::Source(s) => s.rank,
            Provider::Embed(e) => e.rank,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Source,
    Embed,
}

/// Public description of a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub id: String,
    pub name: String,
    pub rank: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_types: Option<Vec<MediaKind>>,
}

impl From<&Source> for ProviderMetadata {
    fn from(s: &Source) -> Self {
        Self {
            kind: ProviderKind::Source,
            id: s.id.clone(),
            name: s.name.clone(),
            rank: s.rank,
            media_types: Some(s.media_kinds()),
        }
    }
}

impl From<&Embed> for ProviderMetadata {
    fn from(e: &Embed) -> Self {
        Self {
            kind: ProviderKind::Embed,
            id: e.id.clone(),
            name: e.name.clone(),
            rank: e.rank,
            media_types: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    #[async_trait]
    impl SourceScraper for Nothing {
        async fn scrape(&self, _: &ScrapeContext, _: &ScrapeMedia) -> Result<SourcererOutput> {
            Ok(SourcererOutput::default())
        }
    }

    #[test]
    fn media_support_builders() {
        let s = Source::new("a", "A", 1, Arc::new(Nothing)).movies_only();
        assert!(s.supports(MediaKind::Movie));
        assert!(!s.supports(MediaKind::Show));
        assert_eq!(s.media_kinds(), vec![MediaKind::Movie]);

        let s = Source::new("b", "B", 2, Arc::new(Nothing)).shows_only();
        assert_eq!(s.media_kinds(), vec![MediaKind::Show]);
    }

    #[test]
    fn source_metadata_lists_media_types() {
        let provider = Provider::Source(Source::new("a", "Alpha", 7, Arc::new(Nothing)));
        let meta = provider.metadata();
        assert_eq!(meta.kind, ProviderKind::Source);
        assert_eq!(meta.rank, 7);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "source");
        assert_eq!(json["mediaTypes"][1], "show");
    }

    #[test]
    fn sourcerer_output_reads_stream_key() {
        let out: SourcererOutput = serde_json::from_str(
            r#"{"stream": [], "embeds": [{"embedId": "upcloud", "url": "https://e/1"}]}"#,
        )
        .unwrap();
        assert!(out.streams.is_empty());
        assert_eq!(out.embeds[0].embed_id, "upcloud");
    }
}
