// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

/// Topology change raised by a [`Subgraph`](super::Subgraph) or a pub/sub
/// scope. Delivered synchronously, before the mutating call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureEvent {
    EntityAdded { entity: String },
    EntityRemoved { entity: String },
    RelationAdded { relation: String },
    RelationRemoved { relation: String },
    PortAdded { port: String },
    PortRemoved { port: String },
    ConnectionsChanged { port: String },
}

/// Receives structure events. `source` is the full name of the container
/// whose topology changed.
pub trait StructureListener: Send + Sync {
    fn on_structure_event(&self, source: &str, event: &StructureEvent);
}
