//! Running a single named provider.

use tracing::{debug, instrument, warn};

use crate::error::{Result, ScrapeError};
use crate::events::EventSink;
use crate::media::ScrapeMedia;
use crate::provider::{EmbedOutput, SourcererOutput};
use crate::registry::Registry;
use crate::validate::validate_playable_streams;

use super::{scrape_embed, scrape_source, EngineOptions};

/// Run source `id` for `media`.
///
/// When the source hands back embed refs, its own streams are returned
/// unprobed alongside them; otherwise every stream is probed and only the
/// playable ones are kept.
///
/// # Errors
///
/// `Configuration` for an unknown id or a media type the source does not
/// handle; `NotFound` when nothing usable comes back; whatever the source
/// itself failed with. Provider errors are also reported on `events`.
#[instrument(skip(registry, engine, media, events), fields(kind = %media.kind()))]
pub async fn run_source(
    registry: &Registry,
    engine: &EngineOptions,
    id: &str,
    media: &ScrapeMedia,
    events: &EventSink,
) -> Result<SourcererOutput> {
    let source = registry
        .source(id)
        .ok_or_else(|| ScrapeError::config(format!("Source with ID '{id}' not found")))?;
    if !source.supports(media.kind()) {
        return Err(ScrapeError::config(format!(
            "Source '{id}' is not compatible with {}s",
            media.kind()
        )));
    }

    let result: Result<SourcererOutput> = async {
        let mut output = scrape_source(registry, engine, source, media, events, id).await?;
        if output.streams.is_empty() && output.embeds.is_empty() {
            return Err(ScrapeError::not_found("No streams found"));
        }
        if output.embeds.is_empty() {
            let playable = validate_playable_streams(
                output.streams,
                id,
                &engine.fetchers,
                &engine.validation,
            )
            .await;
            if playable.is_empty() {
                return Err(ScrapeError::not_found("No playable streams found"));
            }
            output.streams = playable;
        }
        Ok(output)
    }
    .await;

    if let Err(e) = &result {
        warn!(source = id, error = %e, "Source run failed");
        events.report(id, e);
    } else {
        debug!(source = id, "Source run succeeded");
    }
    result
}

/// Run embed `id` on `url` and keep only playable streams.
///
/// # Errors
///
/// `Configuration` for an unknown id; `NotFound` when no valid, playable
/// stream remains; whatever the embed itself failed with.
#[instrument(skip(registry, engine, events))]
pub async fn run_embed(
    registry: &Registry,
    engine: &EngineOptions,
    id: &str,
    url: &str,
    events: &EventSink,
) -> Result<EmbedOutput> {
    let embed = registry
        .embed(id)
        .ok_or_else(|| ScrapeError::config(format!("Embed with ID '{id}' not found")))?;

    let result: Result<EmbedOutput> = async {
        let output = scrape_embed(registry, engine, embed, url, events, id).await?;
        if output.streams.is_empty() {
            return Err(ScrapeError::not_found("No streams found"));
        }
        let playable =
            validate_playable_streams(output.streams, id, &engine.fetchers, &engine.validation)
                .await;
        if playable.is_empty() {
            return Err(ScrapeError::not_found("No playable streams found"));
        }
        Ok(EmbedOutput { streams: playable })
    }
    .await;

    if let Err(e) = &result {
        warn!(embed = id, error = %e, "Embed run failed");
        events.report(id, e);
    }
    result
}
