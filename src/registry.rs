//! The set of providers available for one run.
//!
//! A [`Registry`] is built once from explicit source/embed lists and a
//! [`FeatureSet`], then passed by reference to every runner. There is no
//! process-wide provider list.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::features::FeatureSet;
use crate::media::MediaKind;
use crate::provider::{Embed, Provider, ProviderMetadata, Ranked, Source};

#[derive(Debug, Clone)]
pub struct Registry {
    sources: Vec<Source>,
    embeds: Vec<Embed>,
    features: FeatureSet,
}

impl Registry {
    /// Validate and filter the provider lists.
    ///
    /// Disabled providers are dropped first. Ids must be unique across
    /// sources and embeds combined; ranks must be unique within each kind.
    /// Sources are then filtered by their flags; embeds are kept regardless,
    /// since their streams are flag-checked one by one later.
    pub fn build(sources: Vec<Source>, embeds: Vec<Embed>, features: FeatureSet) -> Result<Self> {
        let sources: Vec<Source> = sources.into_iter().filter(|s| !s.disabled).collect();
        let embeds: Vec<Embed> = embeds.into_iter().filter(|e| !e.disabled).collect();

        let pooled: Vec<Provider> = sources
            .iter()
            .cloned()
            .map(Provider::Source)
            .chain(embeds.iter().cloned().map(Provider::Embed))
            .collect();
        let duplicate_ids = find_duplicates(&pooled, |p| p.id().to_string(), Provider::name);
        if !duplicate_ids.is_empty() {
            return Err(ScrapeError::config(format_duplicate_error(
                "Sources/embeds",
                &duplicate_ids,
                "ID",
            )));
        }

        let duplicate_source_ranks = find_duplicates(&sources, |s| s.rank, |s| &s.name);
        if !duplicate_source_ranks.is_empty() {
            return Err(ScrapeError::config(format_duplicate_error(
                "Sources",
                &duplicate_source_ranks,
                "rank",
            )));
        }

        let duplicate_embed_ranks = find_duplicates(&embeds, |e| e.rank, |e| &e.name);
        if !duplicate_embed_ranks.is_empty() {
            return Err(ScrapeError::config(format_duplicate_error(
                "Embeds",
                &duplicate_embed_ranks,
                "rank",
            )));
        }

        let before = sources.len();
        let sources: Vec<Source> = sources
            .into_iter()
            .filter(|s| features.allows(&s.flags))
            .collect();
        debug!(
            kept = sources.len(),
            dropped = before - sources.len(),
            embeds = embeds.len(),
            "Registry built"
        );

        Ok(Self {
            sources,
            embeds,
            features,
        })
    }

    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    #[must_use]
    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    #[must_use]
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    #[must_use]
    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn embed(&self, id: &str) -> Option<&Embed> {
        self.embeds.iter().find(|e| e.id == id)
    }

    /// Sources in run order that can handle `kind`.
    #[must_use]
    pub fn ordered_sources(&self, order: &[String], kind: MediaKind) -> Vec<Source> {
        reorder_on_id_list(order, &self.sources)
            .into_iter()
            .filter(|s| s.supports(kind))
            .collect()
    }

    #[must_use]
    pub fn ordered_embeds(&self, order: &[String]) -> Vec<Embed> {
        reorder_on_id_list(order, &self.embeds)
    }

    /// Metadata for a source or embed id.
    #[must_use]
    pub fn metadata(&self, id: &str) -> Option<ProviderMetadata> {
        self.provider(id).map(|p| p.metadata())
    }

    /// The source or embed registered under `id`; sources are searched first.
    #[must_use]
    pub fn provider(&self, id: &str) -> Option<Provider> {
        self.source(id)
            .cloned()
            .map(Provider::Source)
            .or_else(|| self.embed(id).cloned().map(Provider::Embed))
    }

    /// Source metadata, highest rank first.
    #[must_use]
    pub fn list_sources(&self) -> Vec<ProviderMetadata> {
        let mut sorted: Vec<&Source> = self.sources.iter().collect();
        sorted.sort_by(|a, b| b.rank.cmp(&a.rank));
        sorted.into_iter().map(ProviderMetadata::from).collect()
    }

    /// Embed metadata, highest rank first.
    #[must_use]
    pub fn list_embeds(&self) -> Vec<ProviderMetadata> {
        let mut sorted: Vec<&Embed> = self.embeds.iter().collect();
        sorted.sort_by(|a, b| b.rank.cmp(&a.rank));
        sorted.into_iter().map(ProviderMetadata::from).collect()
    }
}

/// Explicitly listed ids first, in list order; the rest by descending rank.
///
/// The sort is stable, so ties keep their input order.
pub fn reorder_on_id_list<T: Ranked + Clone>(order: &[String], list: &[T]) -> Vec<T> {
    let position: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .rev()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut copy = list.to_vec();
    copy.sort_by(|a, b| {
        match (position.get(a.id()), position.get(b.id())) {
            (Some(ai), Some(bi)) => ai.cmp(bi),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.rank().cmp(&a.rank()),
        }
    });
    copy
}

/// Groups of items sharing a key, keys and names sorted.
fn find_duplicates<T, K, N>(
    items: &[T],
    key_fn: impl Fn(&T) -> K,
    name_fn: impl Fn(&T) -> &N,
) -> Vec<(K, Vec<String>)>
where
    K: Eq + Hash + Ord + Clone,
    N: AsRef<str> + ?Sized,
{
    let mut groups: HashMap<K, Vec<String>> = HashMap::new();
    for item in items {
        groups
            .entry(key_fn(item))
            .or_default()
            .push(name_fn(item).as_ref().to_string());
    }

    let mut duplicates: Vec<(K, Vec<String>)> = groups
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(k, mut names)| {
            names.sort();
            (k, names)
        })
        .collect();
    duplicates.sort_by(|a, b| a.0.cmp(&b.0));
    duplicates
}

fn format_duplicate_error<K: std::fmt::Display>(
    kind: &str,
    duplicates: &[(K, Vec<String>)],
    key_name: &str,
) -> String {
    let list = duplicates
        .iter()
        .map(|(key, names)| format!("  {key_name} {key}: {}", names.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{kind} have duplicate {key_name}s:\n{list}")
}
