// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use lazyflow_unit_abi::symbols;

use crate::core::binding::GeneratorPackage;
use crate::core::error::BindError;
use crate::core::marshal::{OutputShape, PortBuffer, PortOutput};
use crate::core::Result;

/// The capability set every bound unit must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Initialize,
    Fire,
    Wrapup,
}

impl EntryPoint {
    pub const REQUIRED: [EntryPoint; 3] =
        [EntryPoint::Initialize, EntryPoint::Fire, EntryPoint::Wrapup];

    pub fn name(self) -> &'static str {
        match self {
            EntryPoint::Initialize => "initialize",
            EntryPoint::Fire => "fire",
            EntryPoint::Wrapup => "wrapup",
        }
    }

    /// Exported symbol of this entry point in a native unit.
    pub fn native_symbol(self) -> &'static str {
        match self {
            EntryPoint::Initialize => symbols::INITIALIZE,
            EntryPoint::Fire => symbols::FIRE,
            EntryPoint::Wrapup => symbols::WRAPUP,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A live instance of a generated unit.
pub trait UnitInstance: Send {
    fn initialize(&mut self) -> Result<()>;

    /// Consume one firing's inputs and produce exactly the requested shapes.
    fn fire(&mut self, inputs: &[PortBuffer], outputs: &[OutputShape]) -> Result<Vec<PortOutput>>;

    fn wrapup(&mut self) -> Result<()>;
}

/// An artifact that has been opened but not yet instantiated.
///
/// Dropping it releases whatever the loader acquired.
pub trait OpenedArtifact {
    fn path(&self) -> &Path;

    fn abi_version(&self) -> std::result::Result<u32, BindError>;

    fn exports(&self, entry_point: EntryPoint) -> bool;

    fn instantiate(self: Box<Self>) -> std::result::Result<Box<dyn UnitInstance>, BindError>;
}

/// Opens artifacts of one generator package.
pub trait ArtifactLoader: Send + Sync {
    fn package(&self) -> GeneratorPackage;

    fn open(&self, path: &Path) -> std::result::Result<Box<dyn OpenedArtifact>, BindError>;
}

impl ArtifactLoader for Arc<dyn ArtifactLoader> {
    fn package(&self) -> GeneratorPackage {
        (**self).package()
    }

    fn open(&self, path: &Path) -> std::result::Result<Box<dyn OpenedArtifact>, BindError> {
        (**self).open(path)
    }
}
