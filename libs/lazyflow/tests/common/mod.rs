// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures: a generator that writes unit manifests, a scaling unit,
//! and an interpreted executor that counts its calls.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use lazyflow::core::binding::{EntryPoint, ManagedLoader, UnitManifest, UnitRegistry};
use lazyflow::core::delegates::FileModelIdentity;
use lazyflow::core::marshal::{ChannelRows, OutputShape, PortBuffer, PortOutput, Token};
use lazyflow::core::{
    BoundaryPort, CodeGenerator, GenerationError, GenerationRequest, HostBuilder, HostConfig,
    LinkDescription, PortIo, PortType, Result, Subgraph, SubgraphDescription, SubgraphExecutor,
    UnitInstance,
};

pub const SCALE_UNIT: &str = "tests.scale";

/// Writes a manifest naming `unit` and counts how often it ran.
pub struct ManifestGenerator {
    pub unit: String,
    pub calls: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
    pub omit_wrapup: Arc<AtomicBool>,
    /// Calls left that report success without writing anything.
    pub silent_failures: Arc<AtomicUsize>,
    /// Write here instead of the requested code directory.
    pub output_directory: Mutex<Option<PathBuf>>,
}

impl ManifestGenerator {
    pub fn new(unit: &str) -> Self {
        Self {
            unit: unit.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
            omit_wrapup: Arc::new(AtomicBool::new(false)),
            silent_failures: Arc::new(AtomicUsize::new(0)),
            output_directory: Mutex::new(None),
        }
    }
}

impl CodeGenerator for ManifestGenerator {
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> std::result::Result<PathBuf, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(GenerationError::new(
                request.full_name,
                anyhow::anyhow!("compiler exited with status 1"),
            ));
        }

        let directory = self
            .output_directory
            .lock()
            .clone()
            .unwrap_or_else(|| request.code_directory.to_path_buf());
        let silent = self
            .silent_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if silent {
            return Ok(directory);
        }

        let mut manifest = UnitManifest::new(self.unit.clone());
        if self.omit_wrapup.load(Ordering::SeqCst) {
            manifest.exports.retain(|e| e != EntryPoint::Wrapup.name());
        }
        std::fs::create_dir_all(&directory)
            .map_err(|e| GenerationError::new(request.full_name, e))?;
        manifest
            .write(&request.artifact.path_in(&directory))
            .map_err(|e| GenerationError::new(request.full_name, e))?;
        Ok(directory)
    }
}

/// Multiplies every input value by `factor`. Output channel `c` reads input
/// row `c % rows`.
pub struct ScaleUnit {
    pub factor: i32,
    pub initialized: Arc<AtomicUsize>,
    pub wrapped: Arc<AtomicUsize>,
}

impl UnitInstance for ScaleUnit {
    fn initialize(&mut self) -> Result<()> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn fire(&mut self, inputs: &[PortBuffer], shapes: &[OutputShape]) -> Result<Vec<PortOutput>> {
        let ChannelRows::Int(rows) = &inputs[0].rows else {
            panic!("scale unit expects int input");
        };
        Ok(shapes
            .iter()
            .map(|shape| {
                let out = (0..shape.channels)
                    .map(|c| {
                        let row = &rows[c % rows.len()];
                        (0..shape.rate)
                            .map(|i| row[i % row.len()] * self.factor)
                            .collect()
                    })
                    .collect();
                PortOutput::scalar(shape.port.clone(), ChannelRows::Int(out))
            })
            .collect())
    }

    fn wrapup(&mut self) -> Result<()> {
        self.wrapped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct UnitCounters {
    pub initialized: Arc<AtomicUsize>,
    pub wrapped: Arc<AtomicUsize>,
}

/// Registry holding a doubling [`ScaleUnit`] under [`SCALE_UNIT`].
pub fn scale_registry(counters: &UnitCounters) -> Arc<UnitRegistry> {
    let registry = UnitRegistry::new();
    let counters = counters.clone();
    registry
        .register_fn(SCALE_UNIT, move || {
            Box::new(ScaleUnit {
                factor: 2,
                initialized: counters.initialized.clone(),
                wrapped: counters.wrapped.clone(),
            })
        })
        .unwrap();
    Arc::new(registry)
}

/// Interpreted semantics: forwards channel 0 of `in` to channel 0 of `out`.
#[derive(Default, Clone)]
pub struct CountingExecutor {
    pub preinitialized: Arc<AtomicUsize>,
    pub initialized: Arc<AtomicUsize>,
    pub fired: Arc<AtomicUsize>,
    pub wrapped: Arc<AtomicUsize>,
}

impl SubgraphExecutor for CountingExecutor {
    fn preinitialize(&mut self, _subgraph: &Subgraph) -> Result<()> {
        self.preinitialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn initialize(&mut self, _subgraph: &Subgraph) -> Result<()> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn fire(
        &mut self,
        _subgraph: &Subgraph,
        _ports: &[BoundaryPort],
        io: &mut dyn PortIo,
    ) -> Result<()> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        if io.has_tokens("in", 0, 1) {
            let token: Token = io.get("in", 0)?;
            io.send("out", 0, token)?;
        }
        Ok(())
    }

    fn wrapup(&mut self, _subgraph: &Subgraph) -> Result<()> {
        self.wrapped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// `in -> gain -> out`, both boundary ports int with rate 1.
pub fn scale_description() -> SubgraphDescription {
    SubgraphDescription::new("filter")
        .with_port(BoundaryPort::input("in", PortType::Int))
        .with_port(BoundaryPort::output("out", PortType::Int))
        .with_entity("gain", "Scale", &["input", "output"])
        .with_relation("r1")
        .with_relation("r2")
        .with_link(LinkDescription::boundary("r1", "in"))
        .with_link(LinkDescription::inner("r1", "gain", "input"))
        .with_link(LinkDescription::inner("r2", "gain", "output"))
        .with_link(LinkDescription::boundary("r2", "out"))
}

/// Write a model file dated an hour ago so generated artifacts are newer.
pub fn write_model(dir: &Path) -> PathBuf {
    let path = dir.join("model.json");
    std::fs::write(&path, "{}").unwrap();
    set_mtime(&path, SystemTime::now() - Duration::from_secs(3600));
    path
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

/// A host wired to the fixtures above, plus handles to observe it.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub identity: Arc<FileModelIdentity>,
    pub generator: Arc<ManifestGenerator>,
    pub executor: CountingExecutor,
    pub unit: UnitCounters,
    pub registry: Arc<UnitRegistry>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let model = write_model(dir.path());
        let unit = UnitCounters::default();
        Self {
            identity: Arc::new(FileModelIdentity::new(model)),
            generator: Arc::new(ManifestGenerator::new(SCALE_UNIT)),
            executor: CountingExecutor::default(),
            registry: scale_registry(&unit),
            unit,
            dir,
        }
    }

    pub fn code_directory(&self) -> PathBuf {
        self.dir.path().join("generated")
    }

    pub fn config(&self) -> HostConfig {
        HostConfig::default().with_code_directory(self.code_directory())
    }

    pub fn builder(&self, name: &str, description: SubgraphDescription) -> HostBuilder {
        HostBuilder::new(name, description)
            .config(self.config())
            .generator(self.generator.clone())
            .loader(Arc::new(ManagedLoader::with_registry(self.registry.clone())))
            .executor(self.executor.clone())
            .identity(self.identity.clone())
    }

    pub fn generations(&self) -> usize {
        self.generator.calls.load(Ordering::SeqCst)
    }
}
