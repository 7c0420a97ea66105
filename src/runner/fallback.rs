//! Exhaustive ordered fallback.

use tracing::{debug, info, instrument};

use crate::error::{Result, ScrapeError};
use crate::provider::{EmbedRef, Source};
use crate::registry::Registry;
use crate::stream::Stream;
use crate::validate::validate_playable_stream;

use super::{scrape_embed, scrape_source, EngineOptions, RunOptions, RunOutput};

/// Try sources one at a time until one yields a playable stream.
///
/// A source's own streams win over its embeds: only the first stream is
/// probed. Embeds are tried in embed order, again probing only their first
/// stream. Cancellation is observed between sources, never mid-scrape.
///
/// # Errors
///
/// Only [`ScrapeError::Aborted`]. Every provider error is reported as an
/// update event and the walk continues; exhaustion yields `Ok(None)`.
#[instrument(skip_all, fields(kind = %opts.media.kind()))]
pub async fn run_all(
    registry: &Registry,
    engine: &EngineOptions,
    opts: &RunOptions,
) -> Result<Option<RunOutput>> {
    let sources = registry.ordered_sources(&opts.source_order, opts.media.kind());
    let embed_ids: Vec<String> = registry
        .ordered_embeds(&opts.embed_order)
        .iter()
        .map(|e| e.id.clone())
        .collect();

    opts.events
        .init(sources.iter().map(|s| s.id.clone()).collect());

    for source in &sources {
        if opts.cancel.is_cancelled() {
            info!("Run aborted before source {}", source.id);
            return Err(ScrapeError::Aborted);
        }
        if let Some(found) = try_source(registry, engine, opts, source, &embed_ids).await {
            info!(source = %found.source_id, embed = ?found.embed_id, "Stream found");
            return Ok(Some(found));
        }
    }

    debug!("All sources exhausted");
    Ok(None)
}

async fn try_source(
    registry: &Registry,
    engine: &EngineOptions,
    opts: &RunOptions,
    source: &Source,
    embed_ids: &[String],
) -> Option<RunOutput> {
    let events = &opts.events;
    events.start(&source.id);

    let output = match scrape_source(registry, engine, source, &opts.media, events, &source.id)
        .await
    {
        Ok(out) if out.streams.is_empty() && out.embeds.is_empty() => {
            events.report(&source.id, &ScrapeError::not_found("No streams found"));
            return None;
        }
        Ok(out) => out,
        Err(e) => {
            debug!(source = %source.id, error = %e, "Source failed");
            events.report(&source.id, &e);
            return None;
        }
    };

    if let Some(first) = output.streams.into_iter().next() {
        match validate_playable_stream(first, &source.id, &engine.fetchers, &engine.validation)
            .await
        {
            Some(stream) => {
                return Some(RunOutput {
                    source_id: source.id.clone(),
                    embed_id: None,
                    stream,
                });
            }
            None if output.embeds.is_empty() => {
                events.report(
                    &source.id,
                    &ScrapeError::not_found("No playable streams found"),
                );
                return None;
            }
            None => debug!(source = %source.id, "First stream unplayable, trying embeds"),
        }
    }

    let refs = sort_embed_refs(output.embeds, embed_ids);
    if refs.is_empty() {
        return None;
    }
    events.discover_embeds(&source.id, &refs);

    for (index, embed_ref) in refs.iter().enumerate() {
        let progress_id = format!("{}-{index}", source.id);
        if let Some(stream) = try_embed(registry, engine, opts, embed_ref, &progress_id).await {
            return Some(RunOutput {
                source_id: source.id.clone(),
                embed_id: Some(embed_ref.embed_id.clone()),
                stream,
            });
        }
    }
    None
}

async fn try_embed(
    registry: &Registry,
    engine: &EngineOptions,
    opts: &RunOptions,
    embed_ref: &EmbedRef,
    progress_id: &str,
) -> Option<Stream> {
    let events = &opts.events;
    events.start(progress_id);

    let embed = registry.embed(&embed_ref.embed_id)?;
    let result: Result<Stream> = async {
        let output =
            scrape_embed(registry, engine, embed, &embed_ref.url, events, progress_id).await?;
        let first = output
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::not_found("No streams found"))?;
        validate_playable_stream(first, &embed.id, &engine.fetchers, &engine.validation)
            .await
            .ok_or_else(|| ScrapeError::not_found("No playable streams found"))
    }
    .await;

    match result {
        Ok(stream) => Some(stream),
        Err(e) => {
            debug!(embed = %embed.id, error = %e, "Embed failed");
            events.report(progress_id, &e);
            None
        }
    }
}

/// Order refs by the position of their embed in `embed_ids`.
///
/// Stable, so refs to the same embed keep the order the source gave.
fn sort_embed_refs(mut refs: Vec<EmbedRef>, embed_ids: &[String]) -> Vec<EmbedRef> {
    refs.sort_by_key(|r| {
        embed_ids
            .iter()
            .position(|id| *id == r.embed_id)
            .unwrap_or(usize::MAX)
    });
    refs
}
