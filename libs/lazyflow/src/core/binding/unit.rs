// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::{Path, PathBuf};

use crate::core::binding::UnitInstance;
use crate::core::error::BindError;
use crate::core::marshal::{OutputShape, PortBuffer, PortOutput};
use crate::core::Result;

/// A generated unit bound to its host. Exists only after a successful bind,
/// so all three entry points are always callable.
pub struct CompiledUnit {
    qualified_name: String,
    artifact_path: PathBuf,
    loaded_version: u64,
    instance: Box<dyn UnitInstance>,
}

impl CompiledUnit {
    pub fn new(
        qualified_name: impl Into<String>,
        artifact_path: impl Into<PathBuf>,
        loaded_version: u64,
        instance: Box<dyn UnitInstance>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            artifact_path: artifact_path.into(),
            loaded_version,
            instance,
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Generation this unit was loaded from.
    pub fn loaded_version(&self) -> u64 {
        self.loaded_version
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.instance.initialize()
    }

    pub fn fire(
        &mut self,
        inputs: &[PortBuffer],
        outputs: &[OutputShape],
    ) -> Result<Vec<PortOutput>> {
        self.instance.fire(inputs, outputs)
    }

    pub fn wrapup(&mut self) -> Result<()> {
        self.instance.wrapup()
    }
}

impl std::fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("qualified_name", &self.qualified_name)
            .field("artifact_path", &self.artifact_path)
            .field("loaded_version", &self.loaded_version)
            .finish_non_exhaustive()
    }
}

/// Holds at most one bound unit for a host.
#[derive(Debug, Default)]
pub struct UnitSlot {
    current: Option<CompiledUnit>,
}

impl UnitSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a replacement off to the side, then swap it in.
    ///
    /// The current unit is neither called nor released while `bind` runs. On
    /// failure it stays installed; on success it is released before the new
    /// unit is installed.
    pub fn rebind<F>(&mut self, bind: F) -> std::result::Result<(), BindError>
    where
        F: FnOnce() -> std::result::Result<CompiledUnit, BindError>,
    {
        let fresh = bind()?;
        if let Some(previous) = self.current.take() {
            tracing::debug!(
                "[bind] releasing {} (generation {})",
                previous.artifact_path().display(),
                previous.loaded_version()
            );
            drop(previous);
        }
        self.current = Some(fresh);
        Ok(())
    }

    pub fn current(&self) -> Option<&CompiledUnit> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut CompiledUnit> {
        self.current.as_mut()
    }

    pub fn is_bound(&self) -> bool {
        self.current.is_some()
    }

    pub fn take(&mut self) -> Option<CompiledUnit> {
        self.current.take()
    }
}
