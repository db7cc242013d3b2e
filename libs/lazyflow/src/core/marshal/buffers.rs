// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::graph::{BoundaryPort, PortType};
use crate::core::marshal::{ArrayPayload, Token};
use crate::core::{FlowError, Result};

/// `[channel][sample]` block of unboxed scalars for one port.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelRows {
    Boolean(Vec<Vec<bool>>),
    Int(Vec<Vec<i32>>),
    Double(Vec<Vec<f64>>),
}

impl ChannelRows {
    /// Empty container for `port`. Only boolean, int and double ports can be
    /// marshaled; every other type is rejected here.
    pub fn allocate(port: &BoundaryPort, channels: usize) -> Result<Self> {
        match &port.port_type {
            PortType::Boolean => Ok(ChannelRows::Boolean(Vec::with_capacity(channels))),
            PortType::Int => Ok(ChannelRows::Int(Vec::with_capacity(channels))),
            PortType::Double => Ok(ChannelRows::Double(Vec::with_capacity(channels))),
            other => Err(FlowError::UnsupportedPortType {
                port: port.name.clone(),
                port_type: other.to_string(),
            }),
        }
    }

    pub fn port_type(&self) -> PortType {
        match self {
            ChannelRows::Boolean(_) => PortType::Boolean,
            ChannelRows::Int(_) => PortType::Int,
            ChannelRows::Double(_) => PortType::Double,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            ChannelRows::Boolean(rows) => rows.len(),
            ChannelRows::Int(rows) => rows.len(),
            ChannelRows::Double(rows) => rows.len(),
        }
    }

    pub fn row_lens(&self) -> Vec<usize> {
        match self {
            ChannelRows::Boolean(rows) => rows.iter().map(Vec::len).collect(),
            ChannelRows::Int(rows) => rows.iter().map(Vec::len).collect(),
            ChannelRows::Double(rows) => rows.iter().map(Vec::len).collect(),
        }
    }

    pub fn total_len(&self) -> usize {
        self.row_lens().iter().sum()
    }

    /// Unbox one channel's tokens and append them as a row.
    pub fn push_tokens(&mut self, port: &str, tokens: Vec<Token>) -> Result<()> {
        match self {
            ChannelRows::Boolean(rows) => {
                let row = tokens
                    .into_iter()
                    .map(|token| match token {
                        Token::Boolean(v) => Ok(v),
                        other => Err(mismatch(port, "boolean", &other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                rows.push(row);
            }
            ChannelRows::Int(rows) => {
                let row = tokens
                    .into_iter()
                    .map(|token| match token {
                        Token::Int(v) => Ok(v),
                        other => Err(mismatch(port, "int", &other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                rows.push(row);
            }
            ChannelRows::Double(rows) => {
                let row = tokens
                    .into_iter()
                    .map(|token| match token {
                        Token::Double(v) => Ok(v),
                        // Lossless widening, same as the interpreted domain.
                        Token::Int(v) => Ok(f64::from(v)),
                        other => Err(mismatch(port, "double", &other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                rows.push(row);
            }
        }
        Ok(())
    }

    /// Box every value back into tokens, row by row.
    pub fn into_tokens(self) -> Vec<Vec<Token>> {
        match self {
            ChannelRows::Boolean(rows) => rows
                .into_iter()
                .map(|row| row.into_iter().map(Token::Boolean).collect())
                .collect(),
            ChannelRows::Int(rows) => rows
                .into_iter()
                .map(|row| row.into_iter().map(Token::Int).collect())
                .collect(),
            ChannelRows::Double(rows) => rows
                .into_iter()
                .map(|row| row.into_iter().map(Token::Double).collect())
                .collect(),
        }
    }
}

fn mismatch(port: &str, expected: &str, found: &Token) -> FlowError {
    FlowError::TokenTypeMismatch {
        port: port.to_string(),
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

/// Unboxed input handed to a unit's `fire`.
#[derive(Debug, Clone, PartialEq)]
pub struct PortBuffer {
    pub port: String,
    pub rows: ChannelRows,
}

/// What a unit must produce for one output port.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputShape {
    pub port: String,
    pub port_type: PortType,
    pub channels: usize,
    pub rate: usize,
}

impl OutputShape {
    pub fn expected_values(&self) -> usize {
        self.channels * self.rate
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputRows {
    Scalar(ChannelRows),
    Array(Vec<Vec<ArrayPayload>>),
}

impl OutputRows {
    pub fn row_lens(&self) -> Vec<usize> {
        match self {
            OutputRows::Scalar(rows) => rows.row_lens(),
            OutputRows::Array(rows) => rows.iter().map(Vec::len).collect(),
        }
    }
}

/// Raw values a unit produced for one output port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortOutput {
    pub port: String,
    pub rows: OutputRows,
}

impl PortOutput {
    pub fn scalar(port: impl Into<String>, rows: ChannelRows) -> Self {
        Self {
            port: port.into(),
            rows: OutputRows::Scalar(rows),
        }
    }

    pub fn array(port: impl Into<String>, rows: Vec<Vec<ArrayPayload>>) -> Self {
        Self {
            port: port.into(),
            rows: OutputRows::Array(rows),
        }
    }
}
