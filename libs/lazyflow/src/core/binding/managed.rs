// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Managed units: a JSON manifest on disk naming a unit constructor linked
//! into the process.
//!
//! Units register at compile time via `inventory`:
//!
//! ```ignore
//! lazyflow::inventory::submit! {
//!     lazyflow::core::ManagedUnitRegistration::new("modelcg", || Box::new(ModelCg::default()))
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use lazyflow_unit_abi::LAZYFLOW_UNIT_ABI_VERSION;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::binding::{
    ArtifactLoader, EntryPoint, GeneratorPackage, OpenedArtifact, UnitInstance,
};
use crate::core::error::BindError;
use crate::core::{FlowError, Result};

/// Contents of a `*.unit.json` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitManifest {
    pub abi_version: u32,
    /// Registry key of the unit constructor.
    pub unit: String,
    #[serde(default)]
    pub exports: Vec<String>,
}

impl UnitManifest {
    /// Manifest for the current ABI exporting every required entry point.
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            abi_version: LAZYFLOW_UNIT_ABI_VERSION,
            unit: unit.into(),
            exports: EntryPoint::REQUIRED
                .iter()
                .map(|e| e.name().to_string())
                .collect(),
        }
    }

    pub fn read(path: &Path) -> std::result::Result<Self, BindError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BindError::not_found(path)
            } else {
                BindError::Load {
                    path: path.to_path_buf(),
                    source: Box::new(e),
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|e| BindError::IncompatibleFormat {
            path: path.to_path_buf(),
            reason: format!("not a unit manifest: {}", e),
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FlowError::Other(anyhow::anyhow!("serializing unit manifest: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub type UnitConstructor = Box<dyn Fn() -> Box<dyn UnitInstance> + Send + Sync>;

/// Compile-time registration of a managed unit constructor.
pub struct ManagedUnitRegistration {
    pub key: &'static str,
    pub constructor: fn() -> Box<dyn UnitInstance>,
}

impl ManagedUnitRegistration {
    pub const fn new(key: &'static str, constructor: fn() -> Box<dyn UnitInstance>) -> Self {
        Self { key, constructor }
    }
}

inventory::collect!(ManagedUnitRegistration);

/// Constructors for managed units, keyed by manifest `unit` name.
pub struct UnitRegistry {
    constructors: RwLock<HashMap<String, UnitConstructor>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, key: impl Into<String>, constructor: UnitConstructor) -> Result<()> {
        let key = key.into();
        let mut constructors = self.constructors.write();
        if constructors.contains_key(&key) {
            return Err(FlowError::Configuration(format!(
                "unit '{}' is already registered",
                key
            )));
        }
        tracing::debug!("[bind] registered managed unit '{}'", key);
        constructors.insert(key, constructor);
        Ok(())
    }

    pub fn register_fn<F>(&self, key: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn() -> Box<dyn UnitInstance> + Send + Sync + 'static,
    {
        self.register(key, Box::new(constructor))
    }

    pub fn unregister(&self, key: &str) -> bool {
        self.constructors.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.constructors.read().contains_key(key)
    }

    pub fn create(&self, key: &str) -> Option<Box<dyn UnitInstance>> {
        self.constructors.read().get(key).map(|ctor| ctor())
    }

    pub fn list_registered(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.constructors.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide registry, seeded from every `ManagedUnitRegistration`.
pub static UNIT_REGISTRY: LazyLock<Arc<UnitRegistry>> = LazyLock::new(|| {
    let registry = UnitRegistry::new();
    for registration in inventory::iter::<ManagedUnitRegistration> {
        if let Err(e) = registry.register(registration.key, Box::new(registration.constructor)) {
            tracing::warn!("[bind] {}", e);
        }
    }
    Arc::new(registry)
});

/// Loader for managed units. Resolves manifests against a [`UnitRegistry`].
#[derive(Clone)]
pub struct ManagedLoader {
    registry: Arc<UnitRegistry>,
}

impl ManagedLoader {
    /// Loader backed by [`UNIT_REGISTRY`].
    pub fn global() -> Self {
        Self {
            registry: Arc::clone(&UNIT_REGISTRY),
        }
    }

    pub fn with_registry(registry: Arc<UnitRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<UnitRegistry> {
        &self.registry
    }
}

impl Default for ManagedLoader {
    fn default() -> Self {
        Self::global()
    }
}

impl ArtifactLoader for ManagedLoader {
    fn package(&self) -> GeneratorPackage {
        GeneratorPackage::Managed
    }

    fn open(&self, path: &Path) -> std::result::Result<Box<dyn OpenedArtifact>, BindError> {
        let manifest = UnitManifest::read(path)?;
        Ok(Box::new(ManagedArtifact {
            path: path.to_path_buf(),
            manifest,
            registry: Arc::clone(&self.registry),
        }))
    }
}

struct ManagedArtifact {
    path: PathBuf,
    manifest: UnitManifest,
    registry: Arc<UnitRegistry>,
}

impl OpenedArtifact for ManagedArtifact {
    fn path(&self) -> &Path {
        &self.path
    }

    fn abi_version(&self) -> std::result::Result<u32, BindError> {
        Ok(self.manifest.abi_version)
    }

    fn exports(&self, entry_point: EntryPoint) -> bool {
        self.manifest.exports.iter().any(|e| e == entry_point.name())
    }

    fn instantiate(self: Box<Self>) -> std::result::Result<Box<dyn UnitInstance>, BindError> {
        self.registry
            .create(&self.manifest.unit)
            .ok_or_else(|| BindError::Instantiate {
                path: self.path.clone(),
                reason: format!("no unit registered under '{}'", self.manifest.unit),
            })
    }
}
