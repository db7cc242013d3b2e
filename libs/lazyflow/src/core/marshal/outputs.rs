// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::delegates::PortIo;
use crate::core::graph::{BoundaryPort, PortType};
use crate::core::marshal::{OutputRows, OutputShape, PortOutput};
use crate::core::{FlowError, Result};

/// Expected output layout, one entry per output port in port order.
pub fn output_shapes(ports: &[BoundaryPort]) -> Vec<OutputShape> {
    ports
        .iter()
        .filter(|port| port.is_output())
        .map(|port| OutputShape {
            port: port.name.clone(),
            port_type: port.port_type.clone(),
            channels: port.inside_width,
            rate: port.rate,
        })
        .collect()
}

/// Box and send what a unit produced. Every port's shape is checked before
/// anything is sent, so a malformed result sends nothing.
///
/// Returns the number of tokens sent.
pub fn write_outputs(
    ports: &[BoundaryPort],
    outputs: Vec<PortOutput>,
    io: &mut dyn PortIo,
) -> Result<usize> {
    let output_ports: Vec<&BoundaryPort> = ports.iter().filter(|p| p.is_output()).collect();
    if outputs.len() != output_ports.len() {
        return Err(FlowError::OutputShape {
            port: "<all outputs>".to_string(),
            expected: output_ports.len(),
            found: outputs.len(),
        });
    }

    for (port, output) in output_ports.iter().zip(&outputs) {
        check_shape(port, output)?;
    }

    let mut sent = 0;
    for (port, output) in output_ports.into_iter().zip(outputs) {
        sent += send_port(port, output.rows, io)?;
    }
    Ok(sent)
}

fn check_shape(port: &BoundaryPort, output: &PortOutput) -> Result<()> {
    if output.port != port.name {
        return Err(FlowError::PortNotFound(format!(
            "unit produced '{}' where '{}' was expected",
            output.port, port.name
        )));
    }

    match (&output.rows, &port.port_type) {
        (OutputRows::Scalar(rows), declared) if declared.is_direct_scalar() => {
            if &rows.port_type() != declared {
                return Err(FlowError::TokenTypeMismatch {
                    port: port.name.clone(),
                    expected: declared.to_string(),
                    found: rows.port_type().to_string(),
                });
            }
        }
        (OutputRows::Array(_), PortType::Array(_)) => {}
        (_, declared) => {
            return Err(FlowError::UnsupportedPortType {
                port: port.name.clone(),
                port_type: declared.to_string(),
            });
        }
    }

    let lens = output.rows.row_lens();
    let well_formed = lens.len() == port.inside_width && lens.iter().all(|len| *len == port.rate);
    if !well_formed {
        return Err(FlowError::OutputShape {
            port: port.name.clone(),
            expected: port.inside_width * port.rate,
            found: lens.iter().sum(),
        });
    }
    Ok(())
}

fn send_port(port: &BoundaryPort, rows: OutputRows, io: &mut dyn PortIo) -> Result<usize> {
    let mut sent = 0;
    match rows {
        OutputRows::Scalar(rows) => {
            for (channel, row) in rows.into_tokens().into_iter().enumerate() {
                for token in row {
                    io.send(&port.name, channel, token)?;
                    sent += 1;
                }
            }
        }
        OutputRows::Array(rows) => {
            let PortType::Array(element_type) = &port.port_type else {
                return Err(FlowError::UnsupportedPortType {
                    port: port.name.clone(),
                    port_type: port.port_type.to_string(),
                });
            };
            for (channel, row) in rows.iter().enumerate() {
                for payload in row {
                    let token = payload.to_token(&port.name, element_type)?;
                    io.send(&port.name, channel, token)?;
                    sent += 1;
                }
            }
        }
    }
    tracing::debug!("[marshal] {}: sent {} token(s)", port.name, sent);
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::marshal::{ArrayElement, ArrayPayload, ChannelRows, Token, TokenQueues};

    #[test]
    fn test_sends_rate_times_inside_width() {
        let ports = vec![BoundaryPort::output("out", PortType::Int)
            .multiport()
            .with_width(2)
            .with_inside_width(2)
            .with_rate(3)];
        let outputs = vec![PortOutput::scalar(
            "out",
            ChannelRows::Int(vec![vec![1, 2, 3], vec![4, 5, 6]]),
        )];
        let mut io = TokenQueues::new();

        let sent = write_outputs(&ports, outputs, &mut io).unwrap();
        assert_eq!(sent, 6);
        assert_eq!(io.sent("out", 1), &[Token::Int(4), Token::Int(5), Token::Int(6)]);
    }

    #[test]
    fn test_short_row_sends_nothing() {
        let ports = vec![
            BoundaryPort::output("a", PortType::Int).with_inside_width(1),
            BoundaryPort::output("b", PortType::Int)
                .with_inside_width(1)
                .with_rate(2),
        ];
        let outputs = vec![
            PortOutput::scalar("a", ChannelRows::Int(vec![vec![1]])),
            PortOutput::scalar("b", ChannelRows::Int(vec![vec![1]])),
        ];
        let mut io = TokenQueues::new();

        let err = write_outputs(&ports, outputs, &mut io).unwrap_err();
        assert!(matches!(
            err,
            FlowError::OutputShape {
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert_eq!(io.sent_count("a"), 0);
    }

    #[test]
    fn test_array_outputs_are_reboxed() {
        let ports = vec![BoundaryPort::output("out", PortType::array_of(PortType::Double))
            .with_inside_width(1)];
        let outputs = vec![PortOutput::array(
            "out",
            vec![vec![ArrayPayload::new(vec![
                ArrayElement::Double(1.5),
                ArrayElement::Int(2),
            ])]],
        )];
        let mut io = TokenQueues::new();

        write_outputs(&ports, outputs, &mut io).unwrap();
        assert_eq!(
            io.sent("out", 0),
            &[Token::Array(vec![Token::Double(1.5), Token::Double(2.0)])]
        );
    }

    #[test]
    fn test_scalar_kind_must_match_port() {
        let ports = vec![BoundaryPort::output("out", PortType::Double).with_inside_width(1)];
        let outputs = vec![PortOutput::scalar("out", ChannelRows::Int(vec![vec![1]]))];
        let mut io = TokenQueues::new();
        assert!(matches!(
            write_outputs(&ports, outputs, &mut io),
            Err(FlowError::TokenTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_shapes_follow_port_order() {
        let ports = vec![
            BoundaryPort::input("in", PortType::Int),
            BoundaryPort::output("y", PortType::Int).with_inside_width(2),
            BoundaryPort::output("x", PortType::Boolean).with_rate(4),
        ];
        let shapes = output_shapes(&ports);
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].port, "y");
        assert_eq!(shapes[0].expected_values(), 2);
        assert_eq!(shapes[1].rate, 4);
    }
}
