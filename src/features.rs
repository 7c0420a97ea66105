//! Target capability negotiation.
//!
//! Every provider and every stream carries a set of [`Flag`]s. A deployment
//! [`Target`] plus two switches produce a [`FeatureSet`] which decides what
//! is usable where.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Capability or restriction tag attached to providers and streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    /// CORS headers allow any origin.
    CorsAllowed,
    /// Stream is locked to the requesting IP, so the player must share it.
    IpLocked,
    /// Upstream blocks Cloudflare IPs.
    CfBlocked,
    /// Must not be proxied.
    ProxyBlocked,
}

/// Where the resulting streams will be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Browser with CORS restrictions.
    Browser,
    /// Browser with an extension lifting CORS restrictions.
    BrowserExtension,
    /// Native app, anything plays.
    Native,
    /// No target restrictions.
    #[default]
    Any,
}

impl Target {
    fn base(self) -> FeatureSet {
        match self {
            Target::Browser => FeatureSet {
                requires: vec![Flag::CorsAllowed],
                disallowed: vec![],
            },
            Target::BrowserExtension | Target::Native | Target::Any => FeatureSet::default(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Target::Browser => "browser",
            Target::BrowserExtension => "browser-extension",
            Target::Native => "native",
            Target::Any => "any",
        };
        f.write_str(s)
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "browser" => Ok(Target::Browser),
            "browser-extension" => Ok(Target::BrowserExtension),
            "native" => Ok(Target::Native),
            "any" => Ok(Target::Any),
            other => Err(format!("unknown target '{other}'")),
        }
    }
}

/// Flags a candidate must carry and flags it must not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub requires: Vec<Flag>,
    pub disallowed: Vec<Flag>,
}

impl FeatureSet {
    /// Whether a provider or stream with `flags` is usable under this set.
    #[must_use]
    pub fn allows(&self, flags: &[Flag]) -> bool {
        is_allowed(self, flags)
    }
}

/// Derive the feature set for one run.
///
/// Always returns a fresh value; repeated calls never accumulate flags.
#[must_use]
pub fn derive_feature_set(
    target: Target,
    consistent_ip_for_requests: bool,
    proxy_streams: bool,
) -> FeatureSet {
    let mut features = target.base();
    if !consistent_ip_for_requests {
        features.disallowed.push(Flag::IpLocked);
    }
    if proxy_streams {
        features.disallowed.push(Flag::ProxyBlocked);
    }
    features
}

/// True iff every required flag is present and no disallowed flag is.
#[must_use]
pub fn is_allowed(features: &FeatureSet, flags: &[Flag]) -> bool {
    let has_required = features.requires.iter().all(|f| flags.contains(f));
    if !has_required {
        return false;
    }
    !features.disallowed.iter().any(|f| flags.contains(f))
}
