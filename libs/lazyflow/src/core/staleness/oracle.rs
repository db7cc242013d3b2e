// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use url::Url;

use crate::core::delegates::ModelIdentity;

/// Why a rebuild is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessReason {
    /// The model has unsaved modifications.
    ModelModified,
    /// No model URI is known, so staleness cannot be disproved.
    NoModelUri,
    ArtifactMissing,
    ArtifactOlderThanModel,
    /// The model URI is not a readable local file.
    ModelTimestampUnavailable,
    /// Running without a model identity (headless, tests).
    NoIdentity,
}

impl fmt::Display for StalenessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StalenessReason::ModelModified => "model has unsaved modifications",
            StalenessReason::NoModelUri => "no model URI available",
            StalenessReason::ArtifactMissing => "artifact does not exist",
            StalenessReason::ArtifactOlderThanModel => "artifact is older than the model",
            StalenessReason::ModelTimestampUnavailable => "model timestamp unavailable",
            StalenessReason::NoIdentity => "no model identity",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessVerdict {
    /// `None` means the artifact can be reused.
    pub reason: Option<StalenessReason>,
    /// Counter to name the next artifact with.
    pub disambiguation: u64,
}

impl StalenessVerdict {
    pub fn needs_rebuild(&self) -> bool {
        self.reason.is_some()
    }
}

/// What the oracle looks at for one host.
#[derive(Clone, Copy)]
pub struct StalenessInputs<'a> {
    pub identity: Option<&'a dyn ModelIdentity>,
    /// Used when the identity is absent or has no URI.
    pub model_uri: Option<&'a Url>,
    pub artifact: &'a Path,
}

/// Decides between reusing the artifact on disk and regenerating it.
///
/// Owns the disambiguation counter used to name artifacts of runs that have
/// no stable model identity.
#[derive(Debug, Default)]
pub struct StalenessOracle {
    disambiguation: u64,
}

impl StalenessOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disambiguation(disambiguation: u64) -> Self {
        Self { disambiguation }
    }

    pub fn disambiguation(&self) -> u64 {
        self.disambiguation
    }

    pub fn needs_rebuild(&mut self, inputs: &StalenessInputs<'_>) -> bool {
        self.evaluate(inputs).needs_rebuild()
    }

    /// Rules run in order and the first match wins. Reuse is chosen only
    /// with an unmodified model, a known URI, an artifact at least as new
    /// as the model, and an identity present.
    pub fn evaluate(&mut self, inputs: &StalenessInputs<'_>) -> StalenessVerdict {
        let reason = self.first_rebuild_reason(inputs);
        match reason {
            Some(reason) => tracing::info!(
                "[staleness] rebuild {} ({})",
                inputs.artifact.display(),
                reason
            ),
            None => tracing::debug!("[staleness] reusing {}", inputs.artifact.display()),
        }
        StalenessVerdict {
            reason,
            disambiguation: self.disambiguation,
        }
    }

    fn first_rebuild_reason(&mut self, inputs: &StalenessInputs<'_>) -> Option<StalenessReason> {
        if inputs.identity.is_some_and(|identity| identity.is_modified()) {
            return Some(StalenessReason::ModelModified);
        }

        let uri = inputs
            .identity
            .and_then(|identity| identity.model_uri())
            .or_else(|| inputs.model_uri.cloned());
        let Some(uri) = uri else {
            return Some(StalenessReason::NoModelUri);
        };

        let Some(model_time) = model_file(&uri).and_then(|p| modified_time(&p)) else {
            return Some(StalenessReason::ModelTimestampUnavailable);
        };
        let Some(artifact_time) = modified_time(inputs.artifact) else {
            return Some(StalenessReason::ArtifactMissing);
        };
        if artifact_time < model_time {
            return Some(StalenessReason::ArtifactOlderThanModel);
        }

        if inputs.identity.is_none() {
            self.disambiguation += 1;
            return Some(StalenessReason::NoIdentity);
        }

        None
    }
}

fn model_file(uri: &Url) -> Option<PathBuf> {
    if uri.scheme() != "file" {
        return None;
    }
    uri.to_file_path().ok()
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
