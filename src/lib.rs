//! `sourcerer` - find a playable stream for a title across many providers
//!
//! # Overview
//!
//! Providers come in two kinds. A **source** takes a movie or episode and
//! returns streams directly, or references to **embeds** (third-party players)
//! that can resolve a URL into streams. The engine runs providers, filters
//! what they return against the playback target, and probes candidates to
//! make sure they actually play.
//!
//! - **Feature model**: [`features`] decides which providers and streams are
//!   usable for a [`Target`]
//! - **Registry**: [`Registry`] enforces unique ids and ranks, and orders providers
//! - **Validation**: [`validate`] checks stream structure and playability
//! - **Runners**: [`run_all`] (ordered fallback), [`run_all_fast`] (race),
//!   [`run_source`] / [`run_embed`] (one provider)
//!
//! # Example
//!
//! ```rust,no_run
//! use sourcerer::{EngineConfig, ScrapeMedia, RunOptions, make_providers};
//!
//! # async fn example(sources: Vec<sourcerer::Source>, embeds: Vec<sourcerer::Embed>) -> anyhow::Result<()> {
//! let config = EngineConfig::load()?;
//! let fetchers = config.fetchers()?;
//! let providers = make_providers(config.provider_options(fetchers, sources, embeds))?;
//!
//! let opts = RunOptions::new(ScrapeMedia::movie("Heat", 1995, "949"))
//!     .source_order(config.source_order.clone());
//! if let Some(found) = providers.run_all(&opts).await? {
//!     println!("{} -> {:?}", found.source_id, found.stream);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod controls;
pub mod error;
pub mod events;
pub mod features;
pub mod fetch;
pub mod http_client;
pub mod media;
pub mod plugin;
pub mod provider;
pub mod registry;
pub mod runner;
pub mod stream;
pub mod validate;

pub use config::EngineConfig;
pub use context::{Fetchers, ScrapeContext};
pub use controls::{make_providers, ExternalSources, ProviderBuilder, ProviderOptions, Providers};
pub use error::{FetchError, Result, ScrapeError};
pub use events::{EventSink, ScrapeEvent, UpdateEvent, UpdateStatus};
pub use features::{derive_feature_set, is_allowed, FeatureSet, Flag, Target};
pub use fetch::{FetchBody, FetchOptions, FetchResponse, Fetcher};
pub use http_client::{ProxiedFetcher, SimpleProxyFetcher, StandardFetcher};
pub use media::{MediaKind, ScrapeMedia};
pub use provider::{
    Embed, EmbedOutput, EmbedRef, EmbedScraper, Provider, ProviderMetadata, Source,
    SourceScraper, SourcererOutput,
};
pub use registry::{reorder_on_id_list, Registry};
pub use runner::{
    run_all, run_all_fast, run_embed, run_source, EngineOptions, RaceOptions, RunOptions,
    RunOutput,
};
pub use stream::{Quality, Stream};
pub use validate::{is_valid_stream, validate_playable_stream, ValidationConfig};

/// Version of sourcerer
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
