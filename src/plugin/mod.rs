//! Sources and embeds implemented as external binaries.
//!
//! A plugin receives one JSON request on stdin and answers with one JSON
//! document on stdout. This lets scrapers be written in any language and
//! registered without recompiling.
//!
//! # Configuration
//!
//! Plugins are declared in `~/.config/sourcerer/plugins.toml`:
//!
//! ```toml
//! [[sources]]
//! id = "vault"
//! name = "Vault"
//! rank = 120
//! binary = "/usr/local/bin/vault-scraper"
//! flags = ["cors-allowed"]
//! media_types = ["movie", "show"]
//!
//! [[embeds]]
//! id = "vault-player"
//! name = "Vault Player"
//! rank = 40
//! binary = "/usr/local/bin/vault-embed"
//! ```
//!
//! # Protocol
//!
//! Source request: `{"kind": "source", "media": {"type": "movie", ...}}`,
//! answered with `{"stream": [...], "embeds": [{"embedId": ..., "url": ...}]}`.
//!
//! Embed request: `{"kind": "embed", "url": "https://..."}`, answered with
//! `{"stream": [...]}`.
//!
//! Either may answer `{"notFound": "reason"}` instead.

pub mod config;
pub mod runner;

pub use config::{load_plugins, EmbedPluginConfig, PluginsFile, SourcePluginConfig};
pub use runner::{PluginEmbed, PluginRunner, PluginSource};
