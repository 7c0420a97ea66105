//! Descriptors for the title being looked up.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => f.write_str("movie"),
            MediaKind::Show => f.write_str("show"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub title: String,
    pub release_year: u16,
    pub tmdb_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRef {
    pub number: u32,
    pub tmdb_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    pub number: u32,
    pub tmdb_id: String,
}

/// What a source is asked to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScrapeMedia {
    Movie {
        #[serde(flatten)]
        info: MediaInfo,
    },
    Show {
        #[serde(flatten)]
        info: MediaInfo,
        season: SeasonRef,
        episode: EpisodeRef,
    },
}

impl ScrapeMedia {
    pub fn movie(title: impl Into<String>, release_year: u16, tmdb_id: impl Into<String>) -> Self {
        ScrapeMedia::Movie {
            info: MediaInfo {
                title: title.into(),
                release_year,
                tmdb_id: tmdb_id.into(),
                imdb_id: None,
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        match self {
            ScrapeMedia::Movie { .. } => MediaKind::Movie,
            ScrapeMedia::Show { .. } => MediaKind::Show,
        }
    }

    #[must_use]
    pub fn info(&self) -> &MediaInfo {
        match self {
            ScrapeMedia::Movie { info } | ScrapeMedia::Show { info, .. } => info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_serializes_with_type_and_episode() {
        let media = ScrapeMedia::Show {
            info: MediaInfo {
                title: "Severance".into(),
                release_year: 2022,
                tmdb_id: "95396".into(),
                imdb_id: None,
            },
            season: SeasonRef {
                number: 1,
                tmdb_id: "1".into(),
                title: None,
            },
            episode: EpisodeRef {
                number: 3,
                tmdb_id: "3".into(),
            },
        };
        let value = serde_json::to_value(&media).unwrap();
        assert_eq!(value["type"], "show");
        assert_eq!(value["tmdbId"], "95396");
        assert_eq!(value["episode"]["number"], 3);
        assert_eq!(media.kind(), MediaKind::Show);
    }

    #[test]
    fn movie_helper_sets_kind() {
        let media = ScrapeMedia::movie("Heat", 1995, "949");
        assert_eq!(media.kind(), MediaKind::Movie);
        assert_eq!(media.info().release_year, 1995);
    }
}
