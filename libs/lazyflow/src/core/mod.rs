// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod binding;
pub mod config;
pub mod delegates;
pub mod error;
pub mod graph;
pub mod host;
pub mod lazyflow_home;
pub mod marshal;
pub mod prelude;
pub mod profile;
pub mod pubsub;
pub mod staleness;

pub use binding::{
    artifact_base_name, bind, sanitize_name, ArtifactLoader, ArtifactName, CompiledUnit,
    EntryPoint, GeneratorPackage, ManagedLoader, ManagedUnitRegistration, NativeLoader,
    OpenedArtifact, UnitInstance, UnitManifest, UnitRegistry, UnitSlot, UNIT_REGISTRY,
};
pub use config::{HostConfig, ProjectConfig};
pub use delegates::{
    CodeGenerator, FileModelIdentity, GenerationRequest, ModelIdentity, NoInterpreter,
    NoopInvalidator, PortIo, ScheduleInvalidator, SubgraphExecutor,
};
pub use error::{BindError, FlowError, GenerationError, Result};
pub use graph::{
    BoundaryPort, EntityDescription, LinkDescription, PortDirection, PortType, PubSubBinding,
    PubSubRole, StructureEvent, StructureListener, Subgraph, SubgraphDescription,
};
pub use host::{HostBuilder, HostState, LazyCompositeHost, RecompileFlags, RecompileTracker};
pub use lazyflow_home::{default_code_directory, ensure_lazyflow_home, get_lazyflow_home};
pub use marshal::{
    output_shapes, read_inputs, write_outputs, ArrayElement, ArrayPayload, ChannelRows,
    OutputRows, OutputShape, PortBuffer, PortOutput, Token, TokenQueues,
};
pub use profile::{convert_profile_port, Profile, ProfilePort};
pub use pubsub::{ChannelState, PubSubScope, ReentrancyCounter, ReentrancyGuard};
pub use staleness::{StalenessInputs, StalenessOracle, StalenessReason, StalenessVerdict};
