// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

/// Lifecycle state of a lazy composite host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostState {
    /// Subgraph not materialized.
    #[default]
    Dormant,
    /// Subgraph materialized; runs interpreted.
    Populated,
    /// A trusted profile stands in for the subgraph.
    Profiled,
    /// A compiled unit is bound and callable.
    Bound,
    Running,
    Wrapped,
}

impl HostState {
    pub fn is_compiled(self) -> bool {
        matches!(self, HostState::Bound | HostState::Running)
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HostState::Dormant => "dormant",
            HostState::Populated => "populated",
            HostState::Profiled => "profiled",
            HostState::Bound => "bound",
            HostState::Running => "running",
            HostState::Wrapped => "wrapped",
        };
        f.write_str(text)
    }
}
