//! Lifecycle events emitted while scraping.
//!
//! Delivery is fire-and-forget over an unbounded channel, so a slow observer
//! never stalls a run. Every event is also logged at `debug`.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ScrapeError;
use crate::provider::EmbedRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "notfound")]
    NotFound,
    #[serde(rename = "failure")]
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateEvent {
    pub id: String,
    pub percentage: u8,
    pub status: UpdateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateEvent {
    pub fn pending(id: impl Into<String>, percentage: u8) -> Self {
        Self {
            id: id.into(),
            percentage: percentage.min(100),
            status: UpdateStatus::Pending,
            reason: None,
            error: None,
        }
    }

    /// Terminal update for a provider that ended in `err`.
    ///
    /// Not-found carries its message as `reason`; anything else is a
    /// failure carrying the error text.
    pub fn from_error(id: impl Into<String>, err: &ScrapeError) -> Self {
        let (status, reason, error) = if err.is_not_found() {
            (UpdateStatus::NotFound, Some(err.to_string()), None)
        } else {
            (UpdateStatus::Failure, None, Some(format!("{err:#}")))
        };
        Self {
            id: id.into(),
            percentage: 100,
            status,
            reason,
            error,
        }
    }
}

/// An embed discovered by a source, as announced to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredEmbed {
    /// `"{source_id}-{index}"`, used in subsequent `Start`/`Update` events.
    pub id: String,
    pub embed_scraper_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ScrapeEvent {
    Init {
        #[serde(rename = "sourceIds")]
        source_ids: Vec<String>,
    },
    Start {
        id: String,
    },
    Update(UpdateEvent),
    DiscoverEmbeds {
        #[serde(rename = "sourceId")]
        source_id: String,
        embeds: Vec<DiscoveredEmbed>,
    },
}

/// Optional observer handle. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ScrapeEvent>>,
}

impl EventSink {
    /// A sink that only logs.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScrapeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    #[must_use]
    pub fn from_sender(tx: mpsc::UnboundedSender<ScrapeEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn emit(&self, event: ScrapeEvent) {
        debug!(?event, "scrape event");
        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody is listening.
            let _ = tx.send(event);
        }
    }

    pub fn init(&self, source_ids: Vec<String>) {
        self.emit(ScrapeEvent::Init { source_ids });
    }

    pub fn start(&self, id: &str) {
        self.emit(ScrapeEvent::Start { id: id.to_string() });
    }

    pub fn update(&self, update: UpdateEvent) {
        self.emit(ScrapeEvent::Update(update));
    }

    pub fn report(&self, id: &str, err: &ScrapeError) {
        self.update(UpdateEvent::from_error(id, err));
    }

    pub fn discover_embeds(&self, source_id: &str, refs: &[EmbedRef]) {
        let embeds = refs
            .iter()
            .enumerate()
            .map(|(i, r)| DiscoveredEmbed {
                id: format!("{source_id}-{i}"),
                embed_scraper_id: r.embed_id.clone(),
            })
            .collect();
        self.emit(ScrapeEvent::DiscoverEmbeds {
            source_id: source_id.to_string(),
            embeds,
        });
    }
}
