// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;

use lazyflow_unit_abi::LAZYFLOW_UNIT_ABI_VERSION;

use crate::core::binding::{ArtifactLoader, ArtifactName, CompiledUnit, EntryPoint};
use crate::core::error::BindError;

/// Locate, validate and instantiate a host's generated unit.
///
/// Fails when the artifact is absent, was built against another ABI version,
/// or lacks any of initialize/fire/wrapup. Whatever the loader opened is
/// released on every failure path.
pub fn bind(
    loader: &dyn ArtifactLoader,
    qualified_name: &str,
    artifact: &ArtifactName,
    directory: &Path,
    generation: u64,
) -> Result<CompiledUnit, BindError> {
    let path = artifact.path_in(directory);
    if !path.is_file() {
        return Err(BindError::not_found(path));
    }

    let opened = loader.open(&path)?;

    let found = opened.abi_version()?;
    if found != LAZYFLOW_UNIT_ABI_VERSION {
        return Err(BindError::IncompatibleVersion {
            path,
            found,
            expected: LAZYFLOW_UNIT_ABI_VERSION,
        });
    }

    if let Some(missing) = EntryPoint::REQUIRED.iter().find(|e| !opened.exports(**e)) {
        return Err(BindError::MissingEntryPoint {
            path,
            entry_point: missing.name().to_string(),
        });
    }

    let instance = opened.instantiate()?;
    tracing::info!(
        "[bind] '{}' bound to {} (generation {})",
        qualified_name,
        path.display(),
        generation
    );
    Ok(CompiledUnit::new(qualified_name, path, generation, instance))
}
