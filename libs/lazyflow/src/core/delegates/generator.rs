// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Code generator delegate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::binding::ArtifactName;
use crate::core::error::GenerationError;
use crate::core::graph::{BoundaryPort, SubgraphDescription};

/// Everything a generator needs to emit one unit.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Full hierarchical name of the host being compiled.
    pub full_name: &'a str,
    /// Base name and file name the produced artifact must use.
    pub artifact: &'a ArtifactName,
    pub code_directory: &'a Path,
    pub description: &'a SubgraphDescription,
    /// Boundary ports in the order the unit must marshal them, including
    /// hidden ports for channels served inside the host.
    pub ports: &'a [BoundaryPort],
    /// When false, existing generated sources must be kept.
    pub overwrite: bool,
    /// Generation number the artifact will be bound as.
    pub generation: u64,
}

/// Delegate that turns a subgraph description into a loadable artifact.
///
/// The source-to-source generator and the external compiler live behind
/// this trait; the host only calls it when a rebuild is required.
pub trait CodeGenerator: Send + Sync {
    /// Emit and build the unit. Returns the directory the artifact was
    /// written to.
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<PathBuf, GenerationError>;
}

impl CodeGenerator for Arc<dyn CodeGenerator> {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<PathBuf, GenerationError> {
        (**self).generate(request)
    }
}
