//! Error types surfaced by configuration loading and hook installation.
//!
//! A deferred vehicle selection is not an error; see [`crate::Selection`].
use std::path::PathBuf;

use thiserror::Error;

use crate::patch::HookSite;

/// Failures while reading the traffic configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read traffic config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid traffic config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The external patcher refused to rewrite a code or data location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("patch at {address:#010x} rejected: {reason}")]
pub struct PatchError {
    pub address: u32,
    pub reason: String,
}

/// Errors raised while bringing the randomizer up.
#[derive(Debug, Error)]
pub enum TrafficError {
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error("no address known for hook site {0:?}")]
    UnresolvedSite(HookSite),
}
