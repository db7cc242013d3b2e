// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Binding: atomic rebind, entry point checks, registry bookkeeping.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{scale_description, scale_registry, Fixture, UnitCounters, SCALE_UNIT};
use lazyflow::core::binding::{
    bind, ArtifactName, EntryPoint, GeneratorPackage, ManagedLoader, UnitManifest, UnitRegistry,
    UnitSlot,
};
use lazyflow::core::marshal::{Token, TokenQueues};
use lazyflow::{BindError, HostState, UnitInstance};

#[test]
fn test_failed_rebind_keeps_previous_unit() {
    let fx = Fixture::new();
    let mut host = fx.builder(".model.filter", scale_description()).build().unwrap();
    host.preinitialize().unwrap();
    host.initialize().unwrap();
    host.wrapup().unwrap();
    assert_eq!(host.loaded_version(), Some(1));

    // Next generation is missing an entry point.
    fx.generator.omit_wrapup.store(true, Ordering::SeqCst);
    fx.identity.set_modified(true);
    host.preinitialize().unwrap();
    host.initialize().unwrap();

    assert_eq!(fx.generations(), 2);
    assert_eq!(host.generated_version(), 2);
    assert_eq!(host.loaded_version(), Some(1));
    assert_eq!(host.state(), HostState::Populated);
    assert!(host.last_failure().unwrap().contains("wrapup"));
}

#[test]
fn test_bind_rejects_missing_entry_point() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = ArtifactName::new(".model.filter", 0, GeneratorPackage::Managed).unwrap();
    let mut manifest = UnitManifest::new(SCALE_UNIT);
    manifest.exports.retain(|e| e != EntryPoint::Fire.name());
    manifest.write(&artifact.path_in(dir.path())).unwrap();

    let loader = ManagedLoader::with_registry(scale_registry(&UnitCounters::default()));
    let err = bind(&loader, ".model.filter", &artifact, dir.path(), 1).unwrap_err();
    assert!(matches!(err, BindError::MissingEntryPoint { .. }));
}

#[test]
fn test_bind_missing_artifact_carries_clean_hint() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = ArtifactName::new(".model.filter", 0, GeneratorPackage::Managed).unwrap();
    let loader = ManagedLoader::with_registry(Arc::new(UnitRegistry::new()));

    let err = bind(&loader, ".model.filter", &artifact, dir.path(), 1).unwrap_err();
    assert!(matches!(err, BindError::ArtifactNotFound { .. }));
    assert!(err.to_string().contains(&artifact.file_name()));
    assert_eq!(err.path(), artifact.path_in(dir.path()));
}

#[test]
fn test_bind_rejects_other_abi_version() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = ArtifactName::new(".model.filter", 0, GeneratorPackage::Managed).unwrap();
    let mut manifest = UnitManifest::new(SCALE_UNIT);
    manifest.abi_version += 1;
    manifest.write(&artifact.path_in(dir.path())).unwrap();

    let loader = ManagedLoader::with_registry(scale_registry(&UnitCounters::default()));
    let err = bind(&loader, ".model.filter", &artifact, dir.path(), 1).unwrap_err();
    assert!(matches!(err, BindError::IncompatibleVersion { .. }));
}

#[test]
fn test_slot_swaps_units() {
    let dir = tempfile::tempdir().unwrap();
    let counters = UnitCounters::default();
    let loader = ManagedLoader::with_registry(scale_registry(&counters));
    let first = ArtifactName::new(".model.filter", 0, GeneratorPackage::Managed).unwrap();
    let second = ArtifactName::new(".model.filter", 1, GeneratorPackage::Managed).unwrap();
    UnitManifest::new(SCALE_UNIT)
        .write(&first.path_in(dir.path()))
        .unwrap();
    UnitManifest::new(SCALE_UNIT)
        .write(&second.path_in(dir.path()))
        .unwrap();

    let mut slot = UnitSlot::new();
    slot.rebind(|| bind(&loader, "filter", &first, dir.path(), 1))
        .unwrap();
    slot.rebind(|| bind(&loader, "filter", &second, dir.path(), 2))
        .unwrap();

    let unit = slot.current().unwrap();
    assert_eq!(unit.loaded_version(), 2);
    assert_eq!(unit.artifact_path(), second.path_in(dir.path()));
}

#[test]
fn test_registry_register_unregister() {
    struct Idle;
    impl UnitInstance for Idle {
        fn initialize(&mut self) -> lazyflow::Result<()> {
            Ok(())
        }
        fn fire(
            &mut self,
            _: &[lazyflow::core::marshal::PortBuffer],
            _: &[lazyflow::core::marshal::OutputShape],
        ) -> lazyflow::Result<Vec<lazyflow::core::marshal::PortOutput>> {
            Ok(Vec::new())
        }
        fn wrapup(&mut self) -> lazyflow::Result<()> {
            Ok(())
        }
    }

    let registry = UnitRegistry::new();
    registry.register_fn("idle", || Box::new(Idle)).unwrap();
    assert!(registry.register_fn("idle", || Box::new(Idle)).is_err());
    assert!(registry.contains("idle"));
    assert_eq!(registry.list_registered(), vec!["idle".to_string()]);

    assert!(registry.unregister("idle"));
    assert!(!registry.unregister("idle"));
    assert!(registry.create("idle").is_none());

    registry.register_fn("idle", || Box::new(Idle)).unwrap();
    assert!(registry.create("idle").is_some());
}

#[test]
fn test_artifact_deleted_between_runs_is_regenerated() {
    let fx = Fixture::new();
    let mut host = fx.builder(".model.filter", scale_description()).build().unwrap();
    host.preinitialize().unwrap();
    host.initialize().unwrap();
    host.wrapup().unwrap();

    std::fs::remove_file(host.artifact_path()).unwrap();

    host.preinitialize().unwrap();
    host.initialize().unwrap();
    assert_eq!(fx.generations(), 2);
    assert_eq!(host.state(), HostState::Bound);

    let mut io = TokenQueues::new();
    io.push("in", 0, 7);
    host.fire(&mut io).unwrap();
    assert_eq!(io.sent("out", 0), &[Token::Int(14)]);
}

#[test]
fn test_generation_that_leaves_no_artifact_is_retried_once() {
    let fx = Fixture::new();
    fx.generator.silent_failures.store(1, Ordering::SeqCst);
    let mut host = fx.builder(".model.filter", scale_description()).build().unwrap();

    host.preinitialize().unwrap();
    host.initialize().unwrap();

    assert_eq!(fx.generations(), 2);
    assert_eq!(host.state(), HostState::Bound);
    assert!(host.last_failure().is_none());
    assert_eq!(host.loaded_version(), Some(2));
}

#[test]
fn test_retry_that_still_leaves_no_artifact_degrades() {
    let fx = Fixture::new();
    fx.generator.silent_failures.store(2, Ordering::SeqCst);
    let mut host = fx.builder(".model.filter", scale_description()).build().unwrap();

    host.preinitialize().unwrap();
    host.initialize().unwrap();

    assert_eq!(fx.generations(), 2);
    assert_eq!(host.state(), HostState::Populated);
    assert!(host.loaded_version().is_none());
    let failure = host.last_failure().unwrap();
    assert!(failure.contains(&host.artifact_name().file_name()));

    let mut io = TokenQueues::new();
    io.push("in", 0, 3);
    host.fire(&mut io).unwrap();
    assert_eq!(io.sent("out", 0), &[Token::Int(3)]);
}
