// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::delegates::PortIo;
use crate::core::graph::{BoundaryPort, Subgraph};
use crate::core::{FlowError, Result};

/// Ordinary (interpreted) composite semantics.
///
/// Used whenever no compiled unit is bound: compiled execution disabled,
/// or generate/bind failed and the host degraded for this run.
pub trait SubgraphExecutor: Send {
    fn preinitialize(&mut self, _subgraph: &Subgraph) -> Result<()> {
        Ok(())
    }

    fn initialize(&mut self, _subgraph: &Subgraph) -> Result<()> {
        Ok(())
    }

    fn fire(
        &mut self,
        subgraph: &Subgraph,
        ports: &[BoundaryPort],
        io: &mut dyn PortIo,
    ) -> Result<()>;

    fn wrapup(&mut self, _subgraph: &Subgraph) -> Result<()> {
        Ok(())
    }
}

/// Executor for hosts that can only run compiled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterpreter;

impl SubgraphExecutor for NoInterpreter {
    fn fire(
        &mut self,
        subgraph: &Subgraph,
        _ports: &[BoundaryPort],
        _io: &mut dyn PortIo,
    ) -> Result<()> {
        Err(FlowError::NotSupported(format!(
            "'{}' has no interpreted executor and no compiled unit is bound",
            subgraph.name()
        )))
    }
}
