// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

#![allow(clippy::type_complexity)] // Complex types are clear in context
#![allow(clippy::missing_safety_doc)] // Safety documented in implementation comments

// Re-exported so unit crates can `inventory::submit!` registrations without a
// direct dependency.
pub use inventory;

pub mod core;

pub use core::{
    bind, convert_profile_port, get_lazyflow_home, read_inputs, sanitize_name, write_outputs,
    ArtifactLoader, ArtifactName, BindError, BoundaryPort, CodeGenerator, CompiledUnit,
    FileModelIdentity, FlowError, GenerationError, GenerationRequest, GeneratorPackage,
    HostBuilder, HostConfig, HostState, LazyCompositeHost, ManagedLoader, ModelIdentity,
    NativeLoader, PortDirection, PortIo, PortType, Profile, ProfilePort, ProjectConfig,
    PubSubScope, RecompileFlags, Result, ScheduleInvalidator, StalenessOracle,
    StalenessReason, StalenessVerdict, StructureEvent, StructureListener, Subgraph,
    SubgraphDescription, SubgraphExecutor, Token, TokenQueues, UnitInstance, UnitRegistry,
    UNIT_REGISTRY,
};

pub use lazyflow_unit_abi::LAZYFLOW_UNIT_ABI_VERSION;
