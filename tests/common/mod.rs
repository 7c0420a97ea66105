//! Scripted providers and a recording fetcher shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sourcerer::events::ScrapeEvent;
use sourcerer::features::derive_feature_set;
use sourcerer::stream::{FileStream, HlsStream, StreamCommon, StreamFile};
use sourcerer::{
    Embed, EmbedOutput, EmbedRef, EmbedScraper, EngineOptions, FetchError, FetchOptions,
    FetchResponse, Fetcher, Fetchers, Quality, Registry, ScrapeContext, ScrapeError, ScrapeMedia,
    Source, SourceScraper, SourcererOutput, Stream, Target,
};
use tokio::sync::mpsc::UnboundedReceiver;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ─── Fetcher ─────────────────────────────────────────────────────────────────

/// Answers 200 unless told otherwise; records every URL it sees.
#[derive(Default)]
pub struct MockFetcher {
    statuses: Mutex<BTreeMap<String, u16>>,
    seen: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, url: &str, status: u16) {
        self.statuses
            .lock()
            .unwrap()
            .insert(url.to_string(), status);
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, _ops: FetchOptions) -> Result<FetchResponse, FetchError> {
        self.seen.lock().unwrap().push(url.to_string());
        let status = self.statuses.lock().unwrap().get(url).copied().unwrap_or(200);
        Ok(FetchResponse {
            status_code: status,
            body: "#EXTM3U".into(),
            final_url: url.to_string(),
            headers: BTreeMap::new(),
        })
    }
}

// ─── Streams ─────────────────────────────────────────────────────────────────

pub fn hls(id: &str, playlist: &str) -> Stream {
    Stream::Hls(HlsStream {
        common: StreamCommon {
            id: id.into(),
            ..Default::default()
        },
        playlist: playlist.into(),
        proxy_depth: None,
    })
}

pub fn mp4(id: &str, url: &str) -> Stream {
    Stream::File(FileStream {
        common: StreamCommon {
            id: id.into(),
            ..Default::default()
        },
        qualities: [(Quality::P1080, StreamFile::mp4(url))].into_iter().collect(),
    })
}

pub fn movie() -> ScrapeMedia {
    ScrapeMedia::movie("Heat", 1995, "949")
}

// ─── Scripted providers ──────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Script {
    Output(SourcererOutput),
    NotFound,
    Fail(&'static str),
}

/// Replays a fixed outcome after an optional delay, counting calls.
#[derive(Clone)]
pub struct Scripted {
    script: Script,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    pub fn streams(streams: Vec<Stream>) -> Self {
        Self::output(SourcererOutput {
            streams,
            embeds: vec![],
        })
    }

    pub fn embeds(embeds: Vec<EmbedRef>) -> Self {
        Self::output(SourcererOutput {
            streams: vec![],
            embeds,
        })
    }

    pub fn output(output: SourcererOutput) -> Self {
        Self::new(Script::Output(output))
    }

    pub fn not_found() -> Self {
        Self::new(Script::NotFound)
    }

    pub fn fail(msg: &'static str) -> Self {
        Self::new(Script::Fail(msg))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    async fn play(&self, ctx: &ScrapeContext) -> sourcerer::Result<SourcererOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        ctx.progress(50);
        match &self.script {
            Script::Output(out) => Ok(out.clone()),
            Script::NotFound => Err(ScrapeError::not_found("nothing here")),
            Script::Fail(msg) => Err(anyhow::anyhow!(*msg).into()),
        }
    }

    pub fn source(self, id: &str, rank: i32) -> Source {
        Source::new(id, id.to_uppercase(), rank, Arc::new(self))
    }

    pub fn embed(self, id: &str, rank: i32) -> Embed {
        Embed::new(id, id.to_uppercase(), rank, Arc::new(self))
    }
}

#[async_trait]
impl SourceScraper for Scripted {
    async fn scrape(
        &self,
        ctx: &ScrapeContext,
        _media: &ScrapeMedia,
    ) -> sourcerer::Result<SourcererOutput> {
        self.play(ctx).await
    }
}

#[async_trait]
impl EmbedScraper for Scripted {
    async fn scrape(&self, ctx: &ScrapeContext, _url: &str) -> sourcerer::Result<EmbedOutput> {
        let out = self.play(ctx).await?;
        Ok(EmbedOutput {
            streams: out.streams,
        })
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

// ─── Wiring ──────────────────────────────────────────────────────────────────

pub fn registry(sources: Vec<Source>, embeds: Vec<Embed>) -> Registry {
    Registry::build(sources, embeds, derive_feature_set(Target::Any, true, false))
        .expect("valid registry")
}

pub fn engine(fetcher: &Arc<MockFetcher>) -> EngineOptions {
    let fetcher: Arc<dyn Fetcher> = fetcher.clone();
    EngineOptions::new(Fetchers::new(fetcher))
}

pub fn drain(rx: &mut UnboundedReceiver<ScrapeEvent>) -> Vec<ScrapeEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}
