//! Stream types produced by providers.
//!
//! A [`Stream`] is either an HLS playlist reference or a map of direct file
//! URLs keyed by [`Quality`]. The JSON shape (`"type": "hls" | "file"`,
//! camelCase fields) is also the wire format of external plugins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::features::Flag;

/// Fields shared by both stream variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCommon {
    /// Only unique within one provider output.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub flags: Vec<Flag>,
    #[serde(default)]
    pub captions: Vec<Caption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_track: Option<ThumbnailTrack>,
    /// Headers that must be sent to play the stream.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Headers that improve playback but are optional.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub preferred_headers: BTreeMap<String, String>,
    /// Headers some CDNs want on segment requests only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub segment_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HlsStream {
    #[serde(flatten)]
    pub common: StreamCommon,
    pub playlist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_depth: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStream {
    #[serde(flatten)]
    pub common: StreamCommon,
    pub qualities: BTreeMap<Quality, StreamFile>,
}

/// A playable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Stream {
    Hls(HlsStream),
    File(FileStream),
}

impl Stream {
    #[must_use]
    pub fn common(&self) -> &StreamCommon {
        match self {
            Stream::Hls(s) => &s.common,
            Stream::File(s) => &s.common,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.common().id
    }

    #[must_use]
    pub fn flags(&self) -> &[Flag] {
        &self.common().flags
    }

    #[must_use]
    pub fn is_hls(&self) -> bool {
        matches!(self, Stream::Hls(_))
    }

    /// Preferred headers overlaid by the required ones.
    ///
    /// Names are lowercased, so `Referer` overrides `referer`.
    #[must_use]
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        let common = self.common();
        common
            .preferred_headers
            .iter()
            .chain(&common.headers)
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect()
    }
}

/// Resolution bucket for file streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "360")]
    P360,
    #[serde(rename = "480")]
    P480,
    #[serde(rename = "720")]
    P720,
    #[serde(rename = "1080")]
    P1080,
    #[serde(rename = "4k")]
    P4k,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Mp4,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFile {
    #[serde(rename = "type", default)]
    pub file_type: FileType,
    pub url: String,
}

impl StreamFile {
    pub fn mp4(url: impl Into<String>) -> Self {
        Self {
            file_type: FileType::Mp4,
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailTrack {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionType {
    Srt,
    Vtt,
}

impl CaptionType {
    /// Guess the caption format from the URL extension.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if url.ends_with(".srt") {
            Some(CaptionType::Srt)
        } else if url.ends_with(".vtt") {
            Some(CaptionType::Vtt)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: CaptionType,
    #[serde(default)]
    pub has_cors_restrictions: bool,
    pub language: String,
}
