// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// Resolved token type of a boundary port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Boolean,
    Int,
    Double,
    String,
    Array(Box<PortType>),
    /// Not yet resolved by type inference.
    Unknown,
}

impl PortType {
    pub fn array_of(element: PortType) -> Self {
        PortType::Array(Box::new(element))
    }

    /// Scalar kinds that cross the compiled boundary without conversion.
    pub fn is_direct_scalar(&self) -> bool {
        matches!(self, PortType::Boolean | PortType::Int | PortType::Double)
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::Boolean => f.write_str("boolean"),
            PortType::Int => f.write_str("int"),
            PortType::Double => f.write_str("double"),
            PortType::String => f.write_str("string"),
            PortType::Array(element) => write!(f, "arrayType({})", element),
            PortType::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PubSubRole {
    Publisher,
    Subscriber,
}

/// Participation of a port in a named pub/sub channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PubSubBinding {
    pub role: PubSubRole,
    pub channel: String,
}

fn default_rate() -> usize {
    1
}

fn default_width() -> usize {
    1
}

/// A port on the boundary of a modular composite.
///
/// `width` counts outside connections; `inside_width` counts relations linked
/// to the port from inside the subgraph (or, when the subgraph has not been
/// materialized, the width recorded in the profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPort {
    pub name: String,
    pub direction: PortDirection,
    pub port_type: PortType,
    #[serde(default = "default_rate")]
    pub rate: usize,
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default)]
    pub inside_width: usize,
    #[serde(default)]
    pub multiport: bool,
    #[serde(default)]
    pub is_parameter: bool,
    #[serde(default)]
    pub pub_sub: Option<PubSubBinding>,
    /// Created by the runtime rather than the model author; never persisted.
    #[serde(default, skip_serializing)]
    pub hidden: bool,
}

impl BoundaryPort {
    pub fn new(name: impl Into<String>, direction: PortDirection, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            direction,
            port_type,
            rate: 1,
            width: 1,
            inside_width: 0,
            multiport: false,
            is_parameter: false,
            pub_sub: None,
            hidden: false,
        }
    }

    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name, PortDirection::Input, port_type)
    }

    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name, PortDirection::Output, port_type)
    }

    pub fn with_rate(mut self, rate: usize) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_inside_width(mut self, inside_width: usize) -> Self {
        self.inside_width = inside_width;
        self
    }

    pub fn multiport(mut self) -> Self {
        self.multiport = true;
        self
    }

    pub fn parameter(mut self) -> Self {
        self.is_parameter = true;
        self
    }

    pub fn publisher(mut self, channel: impl Into<String>) -> Self {
        self.pub_sub = Some(PubSubBinding {
            role: PubSubRole::Publisher,
            channel: channel.into(),
        });
        self
    }

    pub fn subscriber(mut self, channel: impl Into<String>) -> Self {
        self.pub_sub = Some(PubSubBinding {
            role: PubSubRole::Subscriber,
            channel: channel.into(),
        });
        self
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }

    /// Channels that carry data through the compiled unit.
    pub fn connected_width(&self) -> usize {
        self.width.min(self.inside_width)
    }
}
