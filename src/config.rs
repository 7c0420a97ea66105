//! Engine configuration loaded from `~/.config/sourcerer/config.toml`.
//!
//! Every field has a default, so a missing file (or an empty one) yields a
//! working configuration. A few settings can be overridden from the
//! environment; see [`EngineConfig::apply_env`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::context::Fetchers;
use crate::controls::{ExternalSources, ProviderOptions};
use crate::error::FetchError;
use crate::features::{derive_feature_set, FeatureSet, Target};
use crate::http_client::{ProxiedFetcher, StandardFetcher, SCRAPER_PROXY_ENV};
use crate::runner::{RaceOptions, DEFAULT_RACE_TIMEOUT, DEFAULT_RACE_TOP_N};
use crate::validate::{ValidationConfig, DEFAULT_PROBE_TIMEOUT, DEFAULT_SKIP_VALIDATION_IDS};

/// Env var that, when `"true"`, keeps only HLS streams.
pub const PREFER_HLS_ONLY_ENV: &str = "PREFER_HLS_ONLY";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub top_n: usize,
    pub timeout_ms: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_RACE_TOP_N,
            timeout_ms: duration_ms(DEFAULT_RACE_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub target: Target,
    pub consistent_ip_for_requests: bool,
    pub proxy_streams: bool,
    pub source_order: Vec<String>,
    pub embed_order: Vec<String>,
    pub race: RaceConfig,
    pub prefer_hls_only: bool,
    pub probe_timeout_ms: u64,
    /// Provider ids whose streams are never probed.
    pub skip_validation: Vec<String>,
    /// `?url=` proxy for the proxied fetcher.
    pub proxy_url: Option<String>,
    /// Register every external source.
    pub include_external: bool,
    /// Register only these external sources; wins over `include_external`.
    pub external_source_ids: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target: Target::Any,
            consistent_ip_for_requests: false,
            proxy_streams: false,
            source_order: Vec::new(),
            embed_order: Vec::new(),
            race: RaceConfig::default(),
            prefer_hls_only: false,
            probe_timeout_ms: duration_ms(DEFAULT_PROBE_TIMEOUT),
            skip_validation: DEFAULT_SKIP_VALIDATION_IDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            proxy_url: None,
            include_external: false,
            external_source_ids: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load from the default path, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_dir().join("config.toml"))?;
        config.apply_env();
        Ok(config)
    }

    /// Load from `path` without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// # Errors
    ///
    /// Returns an error on malformed TOML or unknown enum values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `var`.
    pub fn apply_env_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var(PREFER_HLS_ONLY_ENV) {
            self.prefer_hls_only = v == "true";
        }
        if let Some(v) = var(SCRAPER_PROXY_ENV) {
            let v = v.trim();
            if !v.is_empty() {
                self.proxy_url = Some(v.to_string());
            }
        }
    }

    #[must_use]
    pub fn features(&self) -> FeatureSet {
        let target = if self.proxy_streams {
            Target::Any
        } else {
            self.target
        };
        derive_feature_set(target, self.consistent_ip_for_requests, self.proxy_streams)
    }

    #[must_use]
    pub fn validation(&self) -> ValidationConfig {
        ValidationConfig {
            skip_ids: self.skip_validation.iter().cloned().collect::<HashSet<_>>(),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }

    #[must_use]
    pub fn race_options(&self) -> RaceOptions {
        RaceOptions {
            top_n: self.race.top_n,
            timeout: Duration::from_millis(self.race.timeout_ms),
        }
    }

    #[must_use]
    pub fn external_sources(&self) -> ExternalSources {
        if !self.external_source_ids.is_empty() {
            ExternalSources::Only(self.external_source_ids.clone())
        } else if self.include_external {
            ExternalSources::All
        } else {
            ExternalSources::None
        }
    }

    /// reqwest-backed direct and proxied fetchers.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built or `proxy_url` is invalid.
    pub fn fetchers(&self) -> std::result::Result<Fetchers, FetchError> {
        let direct = StandardFetcher::new()?;
        let proxy = self
            .proxy_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        let proxied = ProxiedFetcher::new(proxy, direct.clone());
        Ok(Fetchers::new(Arc::new(direct)).with_proxied(Arc::new(proxied)))
    }

    /// Options for [`make_providers`](crate::controls::make_providers) over
    /// `sources` and `embeds`.
    #[must_use]
    pub fn provider_options(
        &self,
        fetchers: Fetchers,
        sources: Vec<crate::provider::Source>,
        embeds: Vec<crate::provider::Embed>,
    ) -> ProviderOptions {
        ProviderOptions {
            target: self.target,
            consistent_ip_for_requests: self.consistent_ip_for_requests,
            proxy_streams: self.proxy_streams,
            fetchers,
            sources,
            embeds,
            external_sources: self.external_sources(),
            prefer_hls_only: self.prefer_hls_only,
            validation: self.validation(),
        }
    }
}

/// `~/.config/sourcerer`, or `./sourcerer` when there is no config dir.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sourcerer")
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
