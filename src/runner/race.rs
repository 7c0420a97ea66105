//! Bounded parallel race over the top sources.

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, instrument};

use crate::error::{Result, ScrapeError};
use crate::provider::Source;
use crate::registry::Registry;

use super::{scrape_source, EngineOptions, RaceOptions, RunOptions, RunOutput};

/// Scrape the first `top_n` ordered sources at once and return the first
/// one holding a valid, allowed stream.
///
/// The winning stream is returned as scraped: no playability probe, and
/// embeds are ignored. Losing scrapes are dropped when the race resolves.
/// Returns `Ok(None)` when the deadline passes first or every source
/// finishes empty-handed.
///
/// # Errors
///
/// [`ScrapeError::Aborted`] when `opts.cancel` fires before a winner.
#[instrument(skip_all, fields(kind = %opts.media.kind(), top_n = race.top_n))]
pub async fn run_all_fast(
    registry: &Registry,
    engine: &EngineOptions,
    opts: &RunOptions,
    race: RaceOptions,
) -> Result<Option<RunOutput>> {
    let sources: Vec<Source> = registry
        .ordered_sources(&opts.source_order, opts.media.kind())
        .into_iter()
        .take(race.top_n)
        .collect();
    opts.events
        .init(sources.iter().map(|s| s.id.clone()).collect());

    let mut contenders: FuturesUnordered<_> = sources
        .iter()
        .map(|source| contend(registry, engine, opts, source))
        .collect();

    let first_winner = async {
        while let Some(outcome) = contenders.next().await {
            if outcome.is_some() {
                return outcome;
            }
        }
        None
    };

    tokio::select! {
        biased;
        () = opts.cancel.cancelled() => {
            info!("Race aborted");
            Err(ScrapeError::Aborted)
        }
        winner = first_winner => {
            match &winner {
                Some(w) => info!(source = %w.source_id, "Race won"),
                None => debug!("No source produced a stream"),
            }
            Ok(winner)
        }
        () = tokio::time::sleep(race.timeout) => {
            info!(timeout = ?race.timeout, "Race timed out");
            Ok(None)
        }
    }
}

async fn contend(
    registry: &Registry,
    engine: &EngineOptions,
    opts: &RunOptions,
    source: &Source,
) -> Option<RunOutput> {
    opts.events.start(&source.id);
    let result = scrape_source(registry, engine, source, &opts.media, &opts.events, &source.id)
        .await
        .and_then(|out| {
            out.streams
                .into_iter()
                .next()
                .ok_or_else(|| ScrapeError::not_found("No streams found"))
        });

    match result {
        Ok(stream) => Some(RunOutput {
            source_id: source.id.clone(),
            embed_id: None,
            stream,
        }),
        Err(e) => {
            debug!(source = %source.id, error = %e, "Contender dropped out");
            opts.events.report(&source.id, &e);
            None
        }
    }
}
