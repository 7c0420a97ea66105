//! Stream validity and playability checks.
//!
//! [`is_valid_stream`] is purely structural. [`validate_playable_stream`]
//! goes to the network: one GET for an HLS playlist, one ranged GET per file
//! quality. Any probe that errors or times out counts as "not playable".

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, instrument};

use crate::context::Fetchers;
use crate::fetch::{FetchOptions, Fetcher};
use crate::stream::Stream;

/// URLs containing this are already routed through a stream proxy.
pub const PROXY_MARKER: &str = "/m3u8-proxy?url=";

/// Providers whose streams are returned without probing.
pub const DEFAULT_SKIP_VALIDATION_IDS: [&str; 5] =
    ["cloudnestra", "vidrock", "showbox", "vidlink", "lookmovie"];

/// Budget for a single probe request.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub skip_ids: HashSet<String>,
    pub probe_timeout: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            skip_ids: DEFAULT_SKIP_VALIDATION_IDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl ValidationConfig {
    #[must_use]
    pub fn skips(&self, provider_id: &str) -> bool {
        self.skip_ids.contains(provider_id)
    }
}

/// HLS needs a playlist; file needs at least one quality with a URL.
#[must_use]
pub fn is_valid_stream(stream: &Stream) -> bool {
    match stream {
        Stream::Hls(hls) => !hls.playlist.is_empty(),
        Stream::File(file) => file.qualities.values().any(|q| !q.url.is_empty()),
    }
}

#[must_use]
pub fn is_already_proxied(url: &str) -> bool {
    url.contains(PROXY_MARKER)
}

/// Probe `stream` and return it (file streams pruned to live qualities), or
/// `None` when nothing answers with a status in `[200, 400)`.
#[instrument(skip_all, fields(provider = provider_id, stream = stream.id()))]
pub async fn validate_playable_stream(
    stream: Stream,
    provider_id: &str,
    fetchers: &Fetchers,
    config: &ValidationConfig,
) -> Option<Stream> {
    if config.skips(provider_id) {
        return Some(stream);
    }

    let headers = stream.request_headers();
    match stream {
        Stream::Hls(hls) => {
            if hls.playlist.starts_with("data:") {
                return Some(Stream::Hls(hls));
            }
            let ops = FetchOptions::get().headers(headers);
            probe(fetchers, &hls.playlist, ops, config.probe_timeout)
                .await
                .then_some(Stream::Hls(hls))
        }
        Stream::File(mut file) => {
            let probes = file.qualities.iter().map(|(quality, f)| {
                let ops = FetchOptions::get()
                    .headers(headers.clone())
                    .header("Range", "bytes=0-1");
                let url = f.url.clone();
                async move { (*quality, probe(fetchers, &url, ops, config.probe_timeout).await) }
            });
            let results = join_all(probes).await;
            for (quality, ok) in results {
                if !ok {
                    debug!(?quality, "Dropping unplayable quality");
                    file.qualities.remove(&quality);
                }
            }
            if file.qualities.is_empty() {
                None
            } else {
                Some(Stream::File(file))
            }
        }
    }
}

/// Probe every stream concurrently and keep the survivors, in input order.
pub async fn validate_playable_streams(
    streams: Vec<Stream>,
    provider_id: &str,
    fetchers: &Fetchers,
    config: &ValidationConfig,
) -> Vec<Stream> {
    if config.skips(provider_id) {
        return streams;
    }
    join_all(
        streams
            .into_iter()
            .map(|s| validate_playable_stream(s, provider_id, fetchers, config)),
    )
    .await
    .into_iter()
    .flatten()
    .collect()
}

fn probe_fetcher<'a>(fetchers: &'a Fetchers, url: &str) -> &'a Arc<dyn Fetcher> {
    if is_already_proxied(url) {
        &fetchers.fetcher
    } else {
        &fetchers.proxied_fetcher
    }
}

async fn probe(fetchers: &Fetchers, url: &str, ops: FetchOptions, timeout: Duration) -> bool {
    let fetcher = probe_fetcher(fetchers, url);
    match tokio::time::timeout(timeout, fetcher.fetch(url, ops)).await {
        Ok(Ok(resp)) => {
            let ok = resp.is_ok_status();
            if !ok {
                debug!(url, status = resp.status_code, "Probe rejected");
            }
            ok
        }
        Ok(Err(e)) => {
            debug!(url, error = %e, "Probe failed");
            false
        }
        Err(_) => {
            debug!(url, ?timeout, "Probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::FetchError;
    use crate::fetch::FetchResponse;
    use crate::stream::{FileStream, HlsStream, Quality, StreamCommon, StreamFile};

    /// Answers by URL; records every request.
    #[derive(Default)]
    struct StatusFetcher {
        statuses: BTreeMap<String, u16>,
        seen: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    }

    impl StatusFetcher {
        fn with(pairs: &[(&str, u16)]) -> Arc<Self> {
            Arc::new(Self {
                statuses: pairs.iter().map(|(u, s)| ((*u).to_string(), *s)).collect(),
                seen: Mutex::default(),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Fetcher for StatusFetcher {
        async fn fetch(&self, url: &str, ops: FetchOptions) -> Result<FetchResponse, FetchError> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), ops.headers.clone()));
            match self.statuses.get(url) {
                Some(status) => Ok(FetchResponse {
                    status_code: *status,
                    final_url: url.to_string(),
                    ..Default::default()
                }),
                None => Err(FetchError::Header("unreachable".into())),
            }
        }
    }

    fn hls(playlist: &str) -> Stream {
        Stream::Hls(HlsStream {
            common: StreamCommon {
                id: "primary".into(),
                ..Default::default()
            },
            playlist: playlist.into(),
            proxy_depth: None,
        })
    }

    fn file(urls: &[(Quality, &str)]) -> Stream {
        Stream::File(FileStream {
            common: StreamCommon {
                id: "file".into(),
                ..Default::default()
            },
            qualities: urls
                .iter()
                .map(|(q, u)| (*q, StreamFile::mp4(*u)))
                .collect(),
        })
    }

    fn fetchers(direct: Arc<StatusFetcher>, proxied: Arc<StatusFetcher>) -> Fetchers {
        Fetchers::new(direct).with_proxied(proxied)
    }

    #[test]
    fn structural_validity() {
        assert!(is_valid_stream(&hls("https://cdn/x.m3u8")));
        assert!(!is_valid_stream(&hls("")));
        assert!(!is_valid_stream(&file(&[])));
        assert!(!is_valid_stream(&file(&[(Quality::P720, "")])));
        assert!(is_valid_stream(&file(&[
            (Quality::P720, ""),
            (Quality::P1080, "https://cdn/1080.mp4")
        ])));
    }

    #[tokio::test]
    async fn data_playlist_skips_network() {
        let direct = StatusFetcher::with(&[]);
        let proxied = StatusFetcher::with(&[]);
        let f = fetchers(direct.clone(), proxied.clone());
        let out = validate_playable_stream(
            hls("data:application/vnd.apple.mpegurl;base64,I0VYVE0zVQ=="),
            "src",
            &f,
            &ValidationConfig::default(),
        )
        .await;
        assert!(out.is_some());
        assert_eq!(direct.calls() + proxied.calls(), 0);
    }

    #[tokio::test]
    async fn hls_uses_proxied_fetcher_unless_already_proxied() {
        let direct = StatusFetcher::with(&[("https://p/m3u8-proxy?url=x", 200)]);
        let proxied = StatusFetcher::with(&[("https://cdn/a.m3u8", 200)]);
        let f = fetchers(direct.clone(), proxied.clone());
        let cfg = ValidationConfig::default();

        assert!(validate_playable_stream(hls("https://cdn/a.m3u8"), "src", &f, &cfg)
            .await
            .is_some());
        assert_eq!(proxied.calls(), 1);
        assert_eq!(direct.calls(), 0);

        assert!(
            validate_playable_stream(hls("https://p/m3u8-proxy?url=x"), "src", &f, &cfg)
                .await
                .is_some()
        );
        assert_eq!(direct.calls(), 1);
    }

    #[tokio::test]
    async fn status_outside_range_is_unplayable() {
        let proxied = StatusFetcher::with(&[("https://cdn/500", 500), ("https://cdn/302", 302)]);
        let f = fetchers(StatusFetcher::with(&[]), proxied);
        let cfg = ValidationConfig::default();
        assert!(validate_playable_stream(hls("https://cdn/500"), "src", &f, &cfg)
            .await
            .is_none());
        assert!(validate_playable_stream(hls("https://cdn/302"), "src", &f, &cfg)
            .await
            .is_some());
        // Transport error counts as unplayable, never propagates.
        assert!(validate_playable_stream(hls("https://cdn/none"), "src", &f, &cfg)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn file_qualities_are_pruned() {
        let proxied = StatusFetcher::with(&[
            ("https://cdn/720.mp4", 206),
            ("https://cdn/1080.mp4", 403),
        ]);
        let f = fetchers(StatusFetcher::with(&[]), proxied.clone());
        let out = validate_playable_stream(
            file(&[
                (Quality::P720, "https://cdn/720.mp4"),
                (Quality::P1080, "https://cdn/1080.mp4"),
            ]),
            "src",
            &f,
            &ValidationConfig::default(),
        )
        .await;
        let Some(Stream::File(out)) = out else {
            panic!("expected surviving file stream");
        };
        assert_eq!(out.qualities.keys().copied().collect::<Vec<_>>(), vec![Quality::P720]);

        let seen = proxied.seen.lock().unwrap();
        assert!(seen.iter().all(|(_, h)| h.get("Range").map(String::as_str) == Some("bytes=0-1")));
    }

    #[tokio::test]
    async fn file_with_no_live_quality_is_dropped() {
        let proxied = StatusFetcher::with(&[("https://cdn/720.mp4", 404)]);
        let f = fetchers(StatusFetcher::with(&[]), proxied);
        let out = validate_playable_stream(
            file(&[(Quality::P720, "https://cdn/720.mp4")]),
            "src",
            &f,
            &ValidationConfig::default(),
        )
        .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn probe_headers_overlay_required_on_preferred() {
        let proxied = StatusFetcher::with(&[("https://cdn/a.m3u8", 200)]);
        let f = fetchers(StatusFetcher::with(&[]), proxied.clone());
        let Stream::Hls(mut stream) = hls("https://cdn/a.m3u8") else {
            unreachable!()
        };
        stream
            .common
            .preferred_headers
            .insert("Referer".into(), "https://preferred/".into());
        stream
            .common
            .headers
            .insert("Referer".into(), "https://required/".into());
        validate_playable_stream(Stream::Hls(stream), "src", &f, &ValidationConfig::default())
            .await;
        let seen = proxied.seen.lock().unwrap();
        assert_eq!(seen[0].1["referer"], "https://required/");
    }

    #[tokio::test]
    async fn skip_list_bypasses_probe() {
        let proxied = StatusFetcher::with(&[]);
        let f = fetchers(StatusFetcher::with(&[]), proxied.clone());
        let out = validate_playable_streams(
            vec![hls("https://cdn/dead.m3u8")],
            "vidlink",
            &f,
            &ValidationConfig::default(),
        )
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(proxied.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_probe_times_out_as_unplayable() {
        struct Hang;

        #[async_trait]
        impl Fetcher for Hang {
            async fn fetch(&self, _: &str, _: FetchOptions) -> Result<FetchResponse, FetchError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(FetchResponse {
                    status_code: 200,
                    ..Default::default()
                })
            }
        }

        let f = Fetchers::new(Arc::new(Hang));
        let cfg = ValidationConfig {
            probe_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        assert!(validate_playable_stream(hls("https://cdn/slow.m3u8"), "src", &f, &cfg)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn batch_keeps_order_of_survivors() {
        let proxied = StatusFetcher::with(&[("https://cdn/a", 200), ("https://cdn/c", 200)]);
        let f = fetchers(StatusFetcher::with(&[]), proxied);
        let out = validate_playable_streams(
            vec![hls("https://cdn/a"), hls("https://cdn/b"), hls("https://cdn/c")],
            "src",
            &f,
            &ValidationConfig::default(),
        )
        .await;
        let playlists: Vec<_> = out
            .iter()
            .map(|s| match s {
                Stream::Hls(h) => h.playlist.as_str(),
                Stream::File(_) => "",
            })
            .collect();
        assert_eq!(playlists, vec!["https://cdn/a", "https://cdn/c"]);
    }
}
