//! Process runner backing [`PluginSource`] and [`PluginEmbed`].

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::context::ScrapeContext;
use crate::error::{Result, ScrapeError};
use crate::media::ScrapeMedia;
use crate::provider::{EmbedOutput, EmbedScraper, SourceScraper, SourcererOutput};

/// JSON sent to the plugin on stdin.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum PluginRequest<'a> {
    Source { media: &'a ScrapeMedia },
    Embed { url: &'a str },
}

/// Spawns one plugin binary per request.
#[derive(Debug, Clone)]
pub struct PluginRunner {
    id: String,
    binary: PathBuf,
    args: Vec<String>,
}

impl PluginRunner {
    pub fn new(id: impl Into<String>, binary: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            id: id.into(),
            binary: binary.into(),
            args,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Send `request` and decode the reply as `T`.
    ///
    /// A reply of the form `{"notFound": "reason"}` becomes
    /// [`ScrapeError::NotFound`].
    async fn invoke<T: DeserializeOwned>(&self, request: &PluginRequest<'_>) -> Result<T> {
        let input = serde_json::to_string(request).context("failed to encode plugin request")?;
        let plugin_id = &self.id;

        debug!(plugin = %self.id, binary = %self.binary.display(), "Invoking plugin");

        // Dropping the future (race loser, cancelled run) kills the child.
        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn plugin '{plugin_id}'"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .with_context(|| format!("failed to write to plugin '{plugin_id}' stdin"))?;
        }

        let result = child
            .wait_with_output()
            .await
            .with_context(|| format!("plugin '{plugin_id}' failed"))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(anyhow!(
                "plugin '{plugin_id}' exited with {}: {}",
                result.status,
                stderr.trim()
            )
            .into());
        }

        let stdout = String::from_utf8(result.stdout)
            .with_context(|| format!("plugin '{plugin_id}' output is not valid UTF-8"))?;
        let reply: serde_json::Value = serde_json::from_str(&stdout).with_context(|| {
            format!(
                "plugin '{plugin_id}' returned invalid JSON: {}",
                truncate(&stdout, 200)
            )
        })?;

        if let Some(reason) = reply.get("notFound") {
            let reason = reason.as_str().unwrap_or("No streams found");
            return Err(ScrapeError::not_found(reason));
        }

        serde_json::from_value(reply)
            .with_context(|| format!("plugin '{plugin_id}' reply has the wrong shape"))
            .map_err(ScrapeError::from)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// A [`SourceScraper`] answered by an external binary.
#[derive(Debug, Clone)]
pub struct PluginSource {
    runner: PluginRunner,
}

impl PluginSource {
    #[must_use]
    pub fn new(runner: PluginRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl SourceScraper for PluginSource {
    async fn scrape(&self, ctx: &ScrapeContext, media: &ScrapeMedia) -> Result<SourcererOutput> {
        let output = self.runner.invoke(&PluginRequest::Source { media }).await?;
        ctx.progress(100);
        Ok(output)
    }
}

/// An [`EmbedScraper`] answered by an external binary.
#[derive(Debug, Clone)]
pub struct PluginEmbed {
    runner: PluginRunner,
}

impl PluginEmbed {
    #[must_use]
    pub fn new(runner: PluginRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl EmbedScraper for PluginEmbed {
    async fn scrape(&self, ctx: &ScrapeContext, url: &str) -> Result<EmbedOutput> {
        let output = self.runner.invoke(&PluginRequest::Embed { url }).await?;
        ctx.progress(100);
        Ok(output)
    }
}
