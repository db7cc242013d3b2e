// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::delegates::PortIo;
use crate::core::graph::BoundaryPort;
use crate::core::marshal::{ChannelRows, PortBuffer};
use crate::core::{FlowError, Result};

/// Read one firing's worth of input from every non-parameter input port.
///
/// Each port yields `min(width, inside_width)` rows of exactly `rate`
/// values. Outside channels with no inside connection lose at most one
/// pending token per firing.
pub fn read_inputs(ports: &[BoundaryPort], io: &mut dyn PortIo) -> Result<Vec<PortBuffer>> {
    ports
        .iter()
        .filter(|port| port.is_input() && !port.is_parameter)
        .map(|port| read_port(port, io))
        .collect()
}

fn read_port(port: &BoundaryPort, io: &mut dyn PortIo) -> Result<PortBuffer> {
    let rate = port.rate;
    let width = port.connected_width();
    let mut rows = ChannelRows::allocate(port, width)?;

    for channel in 0..width {
        if !io.has_tokens(&port.name, channel, rate) {
            return Err(FlowError::InsufficientTokens {
                port: port.name.clone(),
                channel,
                rate,
            });
        }
        let mut row = Vec::with_capacity(rate);
        for _ in 0..rate {
            row.push(io.get(&port.name, channel)?);
        }
        rows.push_tokens(&port.name, row)?;
    }

    for channel in width..port.width {
        if io.has_tokens(&port.name, channel, 1) {
            let dropped = io.get(&port.name, channel)?;
            tracing::debug!(
                "[marshal] {}: discarded {} on channel {} (no inside connection)",
                port.name,
                dropped,
                channel
            );
        }
    }

    Ok(PortBuffer {
        port: port.name.clone(),
        rows,
    })
}
