//! Entry points bundling a registry with its fetchers and options.
//!
//! [`make_providers`] builds a [`Providers`] from a provider catalog in one
//! call; [`ProviderBuilder`] assembles one piece by piece.

use std::sync::Arc;

use tracing::debug;

use crate::context::Fetchers;
use crate::error::{Result, ScrapeError};
use crate::events::EventSink;
use crate::features::{derive_feature_set, Target};
use crate::fetch::Fetcher;
use crate::media::ScrapeMedia;
use crate::provider::{Embed, EmbedOutput, ProviderMetadata, Source, SourcererOutput};
use crate::registry::Registry;
use crate::runner::{self, EngineOptions, RaceOptions, RunOptions, RunOutput};
use crate::validate::ValidationConfig;

/// Which external sources from the catalog to register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExternalSources {
    #[default]
    None,
    All,
    Only(Vec<String>),
}

impl ExternalSources {
    fn admits(&self, id: &str) -> bool {
        match self {
            ExternalSources::None => false,
            ExternalSources::All => true,
            ExternalSources::Only(ids) => ids.iter().any(|i| i == id),
        }
    }
}

/// Inputs of [`make_providers`].
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub target: Target,
    pub consistent_ip_for_requests: bool,
    /// Streams will be played through a proxy; overrides `target` with `Any`.
    pub proxy_streams: bool,
    pub fetchers: Fetchers,
    /// Every known source, external ones included.
    pub sources: Vec<Source>,
    pub embeds: Vec<Embed>,
    pub external_sources: ExternalSources,
    pub prefer_hls_only: bool,
    pub validation: ValidationConfig,
}

impl ProviderOptions {
    pub fn new(target: Target, fetchers: Fetchers) -> Self {
        Self {
            target,
            consistent_ip_for_requests: false,
            proxy_streams: false,
            fetchers,
            sources: Vec::new(),
            embeds: Vec::new(),
            external_sources: ExternalSources::None,
            prefer_hls_only: false,
            validation: ValidationConfig::default(),
        }
    }
}

/// Build a provider set from a catalog.
///
/// # Errors
///
/// Configuration error on duplicate ids or ranks among the admitted providers.
pub fn make_providers(opts: ProviderOptions) -> Result<Providers> {
    let target = if opts.proxy_streams {
        Target::Any
    } else {
        opts.target
    };
    let features = derive_feature_set(target, opts.consistent_ip_for_requests, opts.proxy_streams);

    let external = &opts.external_sources;
    let sources: Vec<Source> = opts
        .sources
        .into_iter()
        .filter(|s| !s.external_source || external.admits(&s.id))
        .collect();

    let registry = Registry::build(sources, opts.embeds, features)?;
    debug!(
        %target,
        sources = registry.sources().len(),
        embeds = registry.embeds().len(),
        "Providers ready"
    );

    Ok(Providers {
        registry,
        engine: EngineOptions {
            fetchers: opts.fetchers,
            prefer_hls_only: opts.prefer_hls_only,
            validation: opts.validation,
        },
    })
}

/// A ready-to-run provider set.
#[derive(Debug, Clone)]
pub struct Providers {
    registry: Registry,
    engine: EngineOptions,
}

impl Providers {
    #[must_use]
    pub fn new(registry: Registry, engine: EngineOptions) -> Self {
        Self { registry, engine }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn engine(&self) -> &EngineOptions {
        &self.engine
    }

    /// Ordered fallback over every source. See [`runner::run_all`].
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Aborted`] when cancelled.
    pub async fn run_all(&self, opts: &RunOptions) -> Result<Option<RunOutput>> {
        runner::run_all(&self.registry, &self.engine, opts).await
    }

    /// Race over the top sources. See [`runner::run_all_fast`].
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Aborted`] when cancelled.
    pub async fn run_all_fast(
        &self,
        opts: &RunOptions,
        race: RaceOptions,
    ) -> Result<Option<RunOutput>> {
        runner::run_all_fast(&self.registry, &self.engine, opts, race).await
    }

    pub async fn run_source_scraper(
        &self,
        id: &str,
        media: &ScrapeMedia,
        events: &EventSink,
    ) -> Result<SourcererOutput> {
        runner::run_source(&self.registry, &self.engine, id, media, events).await
    }

    pub async fn run_embed_scraper(
        &self,
        id: &str,
        url: &str,
        events: &EventSink,
    ) -> Result<EmbedOutput> {
        runner::run_embed(&self.registry, &self.engine, id, url, events).await
    }

    #[must_use]
    pub fn get_metadata(&self, id: &str) -> Option<ProviderMetadata> {
        self.registry.metadata(id)
    }

    #[must_use]
    pub fn list_sources(&self) -> Vec<ProviderMetadata> {
        self.registry.list_sources()
    }

    #[must_use]
    pub fn list_embeds(&self) -> Vec<ProviderMetadata> {
        self.registry.list_embeds()
    }
}

/// Fluent assembly of a [`Providers`].
///
/// Providers can be added directly or picked by id from a catalog.
#[derive(Default)]
pub struct ProviderBuilder {
    target: Option<Target>,
    consistent_ip_for_requests: bool,
    fetcher: Option<Arc<dyn Fetcher>>,
    proxied_fetcher: Option<Arc<dyn Fetcher>>,
    browser_fetcher: Option<Arc<dyn Fetcher>>,
    catalog_sources: Vec<Source>,
    catalog_embeds: Vec<Embed>,
    sources: Vec<Source>,
    embeds: Vec<Embed>,
    prefer_hls_only: bool,
    validation: ValidationConfig,
}

impl ProviderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn enable_consistent_ip_for_requests(mut self) -> Self {
        self.consistent_ip_for_requests = true;
        self
    }

    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn proxied_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.proxied_fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn browser_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.browser_fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn prefer_hls_only(mut self, on: bool) -> Self {
        self.prefer_hls_only = on;
        self
    }

    #[must_use]
    pub fn validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Providers that `add_source_by_id` / `add_embed_by_id` pick from.
    #[must_use]
    pub fn catalog(mut self, sources: Vec<Source>, embeds: Vec<Embed>) -> Self {
        self.catalog_sources = sources;
        self.catalog_embeds = embeds;
        self
    }

    /// Register everything in the catalog, external sources included.
    #[must_use]
    pub fn add_catalog_providers(mut self) -> Self {
        self.sources.extend(self.catalog_sources.iter().cloned());
        self.embeds.extend(self.catalog_embeds.iter().cloned());
        self
    }

    #[must_use]
    pub fn add_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    #[must_use]
    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// # Errors
    ///
    /// Configuration error if the catalog has no source `id`.
    pub fn add_source_by_id(mut self, id: &str) -> Result<Self> {
        let source = self
            .catalog_sources
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| ScrapeError::config(format!("Source '{id}' not found")))?;
        self.sources.push(source);
        Ok(self)
    }

    /// # Errors
    ///
    /// Configuration error if the catalog has no embed `id`.
    pub fn add_embed_by_id(mut self, id: &str) -> Result<Self> {
        let embed = self
            .catalog_embeds
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| ScrapeError::config(format!("Embed '{id}' not found")))?;
        self.embeds.push(embed);
        Ok(self)
    }

    /// # Errors
    ///
    /// Configuration error when the target or fetcher is unset, or on
    /// duplicate ids or ranks.
    pub fn build(self) -> Result<Providers> {
        let target = self
            .target
            .ok_or_else(|| ScrapeError::config("Target not set"))?;
        let fetcher = self
            .fetcher
            .ok_or_else(|| ScrapeError::config("Fetcher not set"))?;

        let mut fetchers = Fetchers::new(fetcher);
        if let Some(proxied) = self.proxied_fetcher {
            fetchers = fetchers.with_proxied(proxied);
        }
        if let Some(browser) = self.browser_fetcher {
            fetchers = fetchers.with_browser(browser);
        }

        let features = derive_feature_set(target, self.consistent_ip_for_requests, false);
        let registry = Registry::build(self.sources, self.embeds, features)?;
        Ok(Providers::new(
            registry,
            EngineOptions {
                fetchers,
                prefer_hls_only: self.prefer_hls_only,
                validation: self.validation,
            },
        ))
    }
}
