//! Plugin declarations loaded from `~/.config/sourcerer/plugins.toml`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::features::Flag;
use crate::media::MediaKind;
use crate::provider::{Embed, Source};

use super::runner::{PluginEmbed, PluginRunner, PluginSource};

/// A source backed by an external binary.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcePluginConfig {
    pub id: String,
    pub name: String,
    pub rank: i32,
    pub binary: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub flags: Vec<Flag>,
    /// Empty means both movies and shows.
    #[serde(default)]
    pub media_types: Vec<MediaKind>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub external: bool,
}

/// An embed backed by an external binary.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedPluginConfig {
    pub id: String,
    pub name: String,
    pub rank: i32,
    pub binary: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub flags: Vec<Flag>,
    #[serde(default)]
    pub disabled: bool,
}

impl SourcePluginConfig {
    #[must_use]
    pub fn into_source(self) -> Source {
        let runner = PluginRunner::new(self.id.clone(), self.binary, self.args);
        let mut source = Source::new(
            self.id,
            self.name,
            self.rank,
            Arc::new(PluginSource::new(runner)),
        )
        .with_flags(self.flags);
        if !self.media_types.is_empty() {
            source.supports_movie = self.media_types.contains(&MediaKind::Movie);
            source.supports_show = self.media_types.contains(&MediaKind::Show);
        }
        source.disabled = self.disabled;
        source.external_source = self.external;
        source
    }
}

impl EmbedPluginConfig {
    #[must_use]
    pub fn into_embed(self) -> Embed {
        let runner = PluginRunner::new(self.id.clone(), self.binary, self.args);
        let mut embed = Embed::new(self.id, self.name, self.rank, Arc::new(PluginEmbed::new(runner)))
            .with_flags(self.flags);
        embed.disabled = self.disabled;
        embed
    }
}

/// Top-level plugins configuration file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PluginsFile {
    #[serde(default)]
    pub sources: Vec<SourcePluginConfig>,
    #[serde(default)]
    pub embeds: Vec<EmbedPluginConfig>,
}

impl PluginsFile {
    /// Materialize every declared plugin as a provider.
    #[must_use]
    pub fn into_providers(self) -> (Vec<Source>, Vec<Embed>) {
        (
            self.sources
                .into_iter()
                .map(SourcePluginConfig::into_source)
                .collect(),
            self.embeds
                .into_iter()
                .map(EmbedPluginConfig::into_embed)
                .collect(),
        )
    }
}

/// Load plugin declarations from the default location.
///
/// Returns an empty file if it doesn't exist (plugins are optional).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_plugins() -> Result<PluginsFile> {
    load_plugins_from(&config_path())
}

/// Load plugin declarations from `path`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_plugins_from(path: &Path) -> Result<PluginsFile> {
    if !path.exists() {
        return Ok(PluginsFile::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

fn config_path() -> PathBuf {
    crate::config::config_dir().join("plugins.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let file: PluginsFile = toml::from_str("").unwrap();
        assert!(file.sources.is_empty());
        assert!(file.embeds.is_empty());
    }

    #[test]
    fn parse_source_and_embed() {
        let toml_str = r#"
[[sources]]
id = "vault"
name = "Vault"
rank = 120
binary = "/usr/local/bin/vault-scraper"
args = ["--json"]
flags = ["cors-allowed"]
media_types = ["movie"]

[[embeds]]
id = "vault-player"
name = "Vault Player"
rank = 40
binary = "/usr/local/bin/vault-embed"
"#;
        let file: PluginsFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.sources.len(), 1);
        assert_eq!(file.sources[0].flags, vec![Flag::CorsAllowed]);
        assert_eq!(file.sources[0].args, vec!["--json"]);
        assert_eq!(file.embeds[0].rank, 40);

        let (sources, embeds) = file.into_providers();
        assert!(sources[0].supports(MediaKind::Movie));
        assert!(!sources[0].supports(MediaKind::Show));
        assert!(!sources[0].external_source);
        assert_eq!(embeds[0].id, "vault-player");
    }

    #[test]
    fn no_media_types_means_both() {
        let toml_str = r#"
[[sources]]
id = "any"
name = "Any"
rank = 1
binary = "/bin/true"
external = true
"#;
        let file: PluginsFile = toml::from_str(toml_str).unwrap();
        let (sources, _) = file.into_providers();
        assert!(sources[0].supports(MediaKind::Movie));
        assert!(sources[0].supports(MediaKind::Show));
        assert!(sources[0].external_source);
    }

    #[test]
    fn missing_file_is_empty() {
        let file = load_plugins_from(Path::new("/nonexistent/sourcerer/plugins.toml")).unwrap();
        assert!(file.sources.is_empty());
    }
}
