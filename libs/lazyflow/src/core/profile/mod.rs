// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Boundary contract of a compiled unit, usable without materializing the
//! subgraph.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::graph::{
    BoundaryPort, PortDirection, PortType, PubSubBinding, PubSubRole, SubgraphDescription,
};
use crate::core::{FlowError, Result};

/// One boundary port as recorded in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePort {
    pub name: String,
    pub direction: PortDirection,
    /// Outside connection count.
    pub width: usize,
    /// Relations linked from inside when the profile was taken.
    pub inside_width: usize,
    pub rate: usize,
    pub multiport: bool,
    #[serde(default)]
    pub pub_sub: Option<PubSubBinding>,
    pub port_type: PortType,
}

impl ProfilePort {
    pub fn is_publisher(&self) -> bool {
        matches!(&self.pub_sub, Some(b) if b.role == PubSubRole::Publisher)
    }

    pub fn is_subscriber(&self) -> bool {
        matches!(&self.pub_sub, Some(b) if b.role == PubSubRole::Subscriber)
    }

    pub fn channel(&self) -> Option<&str> {
        self.pub_sub.as_ref().map(|b| b.channel.as_str())
    }

    /// Rebuild the boundary port this entry describes. Ports created from a
    /// profile for pub/sub entries are hidden.
    pub fn to_boundary_port(&self) -> BoundaryPort {
        BoundaryPort {
            name: self.name.clone(),
            direction: self.direction,
            port_type: self.port_type.clone(),
            rate: self.rate,
            width: self.width,
            inside_width: self.inside_width,
            multiport: self.multiport,
            is_parameter: false,
            pub_sub: self.pub_sub.clone(),
            hidden: self.pub_sub.is_some(),
        }
    }
}

/// Record `port` for a profile.
///
/// Unresolved types become `int`. This is the only place a type is
/// defaulted; marshaling rejects anything it cannot carry.
pub fn convert_profile_port(port: &BoundaryPort) -> ProfilePort {
    let port_type = match &port.port_type {
        PortType::Unknown => {
            tracing::debug!("[host] port '{}' has no resolved type, recording int", port.name);
            PortType::Int
        }
        other => other.clone(),
    };
    ProfilePort {
        name: port.name.clone(),
        direction: port.direction,
        width: port.width,
        inside_width: port.inside_width,
        rate: port.rate,
        multiport: port.multiport,
        pub_sub: port.pub_sub.clone(),
        port_type,
    }
}

/// Immutable snapshot of a unit's boundary. Ports are kept in marshaling
/// order. A changed boundary produces a new profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    unit_name: String,
    /// Fingerprint of the subgraph description the unit was generated from.
    fingerprint: String,
    ports: Vec<ProfilePort>,
    /// Where the generator left the artifact, when not the code directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artifact_directory: Option<PathBuf>,
}

impl Profile {
    pub fn new(
        unit_name: impl Into<String>,
        fingerprint: impl Into<String>,
        ports: Vec<ProfilePort>,
    ) -> Self {
        Self {
            unit_name: unit_name.into(),
            fingerprint: fingerprint.into(),
            ports,
            artifact_directory: None,
        }
    }

    pub fn with_artifact_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.artifact_directory = Some(directory.into());
        self
    }

    /// Profile of `ports` as generated from `description`.
    pub fn capture(
        unit_name: impl Into<String>,
        description: &SubgraphDescription,
        ports: &[BoundaryPort],
    ) -> Result<Self> {
        Ok(Self::new(
            unit_name,
            description.fingerprint()?,
            ports.iter().map(convert_profile_port).collect(),
        ))
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn ports(&self) -> &[ProfilePort] {
        &self.ports
    }

    pub fn port(&self, name: &str) -> Option<&ProfilePort> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn artifact_directory(&self) -> Option<&Path> {
        self.artifact_directory.as_deref()
    }

    /// Generated from exactly this description.
    pub fn matches(&self, description: &SubgraphDescription) -> bool {
        description
            .fingerprint()
            .map(|f| f == self.fingerprint)
            .unwrap_or(false)
    }

    pub fn boundary_ports(&self) -> Vec<BoundaryPort> {
        self.ports.iter().map(ProfilePort::to_boundary_port).collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            FlowError::Configuration(format!("Failed to parse profile {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FlowError::Other(anyhow::anyhow!("serialize profile: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
