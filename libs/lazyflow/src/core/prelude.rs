// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Commonly used types for `use lazyflow::core::prelude::*`.

pub use crate::core::{
    // Errors
    error::{FlowError, Result},

    // Host
    host::{HostBuilder, HostState, LazyCompositeHost},

    // Delegates the embedding application supplies
    delegates::{CodeGenerator, GenerationRequest, ModelIdentity, PortIo, SubgraphExecutor},

    // Description of the deferred subgraph
    graph::{BoundaryPort, LinkDescription, PortType, SubgraphDescription},

    // Compiled units
    binding::{UnitInstance, UnitManifest},
    marshal::{ChannelRows, OutputShape, PortBuffer, PortOutput, Token},

    config::HostConfig,
};
