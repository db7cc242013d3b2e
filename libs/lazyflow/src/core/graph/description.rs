// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Deferred description of a modular composite's internals.
//!
//! A host keeps this around instead of a live subgraph until something
//! forces materialization.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::graph::BoundaryPort;
use crate::core::{FlowError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    pub name: String,
    /// Actor class the generator emits code for.
    pub class: String,
    #[serde(default)]
    pub ports: Vec<String>,
}

/// A link between a relation and a port. `entity` is `None` for the
/// composite's own boundary ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescription {
    pub relation: String,
    #[serde(default)]
    pub entity: Option<String>,
    pub port: String,
}

impl LinkDescription {
    pub fn boundary(relation: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            entity: None,
            port: port.into(),
        }
    }

    pub fn inner(
        relation: impl Into<String>,
        entity: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            relation: relation.into(),
            entity: Some(entity.into()),
            port: port.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubgraphDescription {
    pub name: String,
    #[serde(default)]
    pub ports: Vec<BoundaryPort>,
    #[serde(default)]
    pub entities: Vec<EntityDescription>,
    #[serde(default)]
    pub relations: Vec<String>,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
}

impl SubgraphDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: BoundaryPort) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_entity(mut self, name: &str, class: &str, ports: &[&str]) -> Self {
        self.entities.push(EntityDescription {
            name: name.to_string(),
            class: class.to_string(),
            ports: ports.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    pub fn with_relation(mut self, name: &str) -> Self {
        self.relations.push(name.to_string());
        self
    }

    pub fn with_link(mut self, link: LinkDescription) -> Self {
        self.links.push(link);
        self
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            FlowError::Configuration(format!(
                "Failed to parse subgraph description {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// SHA-256 over the canonical JSON form. Profiles record it so a profile
    /// written for another description is never trusted.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| FlowError::Other(anyhow::anyhow!("serialize description: {}", e)))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
