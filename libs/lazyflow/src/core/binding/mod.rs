// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Turning generated artifacts into callable units.

mod bind;
mod loader;
mod managed;
mod naming;
mod native;
mod unit;

pub use bind::bind;
pub use loader::{ArtifactLoader, EntryPoint, OpenedArtifact, UnitInstance};
pub use managed::{
    ManagedLoader, ManagedUnitRegistration, UnitConstructor, UnitManifest, UnitRegistry,
    UNIT_REGISTRY,
};
pub use naming::{
    artifact_base_name, native_file_name, sanitize_name, ArtifactName, GeneratorPackage,
};
pub use native::NativeLoader;
pub use unit::{CompiledUnit, UnitSlot};

use std::sync::Arc;

/// Default loader for a generator package.
pub fn loader_for(package: GeneratorPackage) -> Arc<dyn ArtifactLoader> {
    match package {
        GeneratorPackage::Native => Arc::new(NativeLoader::new()),
        GeneratorPackage::Managed => Arc::new(ManagedLoader::global()),
    }
}
