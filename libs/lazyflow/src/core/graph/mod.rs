// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod description;
mod events;
mod port;
mod subgraph;

pub use description::{EntityDescription, LinkDescription, SubgraphDescription};
pub use events::{StructureEvent, StructureListener};
pub use port::{BoundaryPort, PortDirection, PortType, PubSubBinding, PubSubRole};
pub use subgraph::Subgraph;
