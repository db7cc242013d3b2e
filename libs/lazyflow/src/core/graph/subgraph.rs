// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::core::graph::{StructureEvent, StructureListener, SubgraphDescription};
use crate::core::{FlowError, Result};

#[derive(Debug, Clone)]
enum SubgraphNode {
    Boundary { port: String },
    Entity { name: String, class: String, ports: Vec<String> },
    Relation { name: String },
}

/// Edge from a port holder (boundary port or entity) to a relation.
#[derive(Debug, Clone)]
struct Link {
    port: String,
}

/// Materialized internals of a modular composite.
///
/// Every mutator emits a [`StructureEvent`] to the registered listeners
/// before returning.
pub struct Subgraph {
    name: String,
    graph: StableDiGraph<SubgraphNode, Link>,
    boundary: HashMap<String, NodeIndex>,
    entities: HashMap<String, NodeIndex>,
    relations: HashMap<String, NodeIndex>,
    relation_counter: usize,
    listeners: Vec<Arc<dyn StructureListener>>,
}

impl Subgraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: StableDiGraph::new(),
            boundary: HashMap::new(),
            entities: HashMap::new(),
            relations: HashMap::new(),
            relation_counter: 0,
            listeners: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_listener(&mut self, listener: Arc<dyn StructureListener>) {
        self.listeners.push(listener);
    }

    /// Apply a deferred description on top of the current contents.
    pub fn populate(&mut self, description: &SubgraphDescription) -> Result<()> {
        for port in &description.ports {
            self.add_port(&port.name)?;
        }
        for entity in &description.entities {
            self.add_entity(&entity.name, &entity.class, entity.ports.clone())?;
        }
        for relation in &description.relations {
            self.add_relation(relation)?;
        }
        for link in &description.links {
            self.link(&link.relation, link.entity.as_deref(), &link.port)?;
        }
        Ok(())
    }

    pub fn add_port(&mut self, port: &str) -> Result<()> {
        if self.boundary.contains_key(port) {
            return Err(FlowError::Graph(format!(
                "port '{}' already exists on '{}'",
                port, self.name
            )));
        }
        let index = self.graph.add_node(SubgraphNode::Boundary {
            port: port.to_string(),
        });
        self.boundary.insert(port.to_string(), index);
        self.emit(StructureEvent::PortAdded {
            port: port.to_string(),
        });
        Ok(())
    }

    pub fn remove_port(&mut self, port: &str) -> Result<()> {
        let index = self
            .boundary
            .remove(port)
            .ok_or_else(|| FlowError::PortNotFound(format!("{}.{}", self.name, port)))?;
        self.graph.remove_node(index);
        self.emit(StructureEvent::PortRemoved {
            port: port.to_string(),
        });
        Ok(())
    }

    pub fn add_entity(&mut self, name: &str, class: &str, ports: Vec<String>) -> Result<()> {
        if self.entities.contains_key(name) {
            return Err(FlowError::Graph(format!(
                "entity '{}' already exists in '{}'",
                name, self.name
            )));
        }
        let index = self.graph.add_node(SubgraphNode::Entity {
            name: name.to_string(),
            class: class.to_string(),
            ports,
        });
        self.entities.insert(name.to_string(), index);
        self.emit(StructureEvent::EntityAdded {
            entity: name.to_string(),
        });
        Ok(())
    }

    pub fn remove_entity(&mut self, name: &str) -> Result<()> {
        let index = self.entities.remove(name).ok_or_else(|| {
            FlowError::Graph(format!("no entity '{}' in '{}'", name, self.name))
        })?;
        self.graph.remove_node(index);
        self.emit(StructureEvent::EntityRemoved {
            entity: name.to_string(),
        });
        Ok(())
    }

    pub fn add_relation(&mut self, name: &str) -> Result<()> {
        if self.relations.contains_key(name) {
            return Err(FlowError::Graph(format!(
                "relation '{}' already exists in '{}'",
                name, self.name
            )));
        }
        let index = self.graph.add_node(SubgraphNode::Relation {
            name: name.to_string(),
        });
        self.relations.insert(name.to_string(), index);
        self.emit(StructureEvent::RelationAdded {
            relation: name.to_string(),
        });
        Ok(())
    }

    /// Add a relation under a fresh `relationN` name and return the name.
    pub fn new_relation(&mut self) -> Result<String> {
        let name = loop {
            self.relation_counter += 1;
            let candidate = format!("relation{}", self.relation_counter);
            if !self.relations.contains_key(&candidate) {
                break candidate;
            }
        };
        self.add_relation(&name)?;
        Ok(name)
    }

    pub fn remove_relation(&mut self, name: &str) -> Result<()> {
        let index = self.relations.remove(name).ok_or_else(|| {
            FlowError::Graph(format!("no relation '{}' in '{}'", name, self.name))
        })?;
        self.graph.remove_node(index);
        self.emit(StructureEvent::RelationRemoved {
            relation: name.to_string(),
        });
        Ok(())
    }

    /// Link `port` (on `entity`, or on the boundary when `entity` is `None`)
    /// to `relation`.
    pub fn link(&mut self, relation: &str, entity: Option<&str>, port: &str) -> Result<()> {
        let holder = self.port_holder(entity, port)?;
        let relation_index = self.relation_index(relation)?;
        self.graph.add_edge(
            holder,
            relation_index,
            Link {
                port: port.to_string(),
            },
        );
        self.emit(StructureEvent::ConnectionsChanged {
            port: qualified_port(entity, port),
        });
        Ok(())
    }

    pub fn unlink(&mut self, relation: &str, entity: Option<&str>, port: &str) -> Result<()> {
        let holder = self.port_holder(entity, port)?;
        let relation_index = self.relation_index(relation)?;
        let edge = self
            .graph
            .edges_connecting(holder, relation_index)
            .find(|edge| edge.weight().port == port)
            .map(|edge| edge.id())
            .ok_or_else(|| {
                FlowError::Graph(format!(
                    "'{}' is not linked to relation '{}'",
                    qualified_port(entity, port),
                    relation
                ))
            })?;
        self.graph.remove_edge(edge);
        self.emit(StructureEvent::ConnectionsChanged {
            port: qualified_port(entity, port),
        });
        Ok(())
    }

    /// Number of relations linked to a boundary port from inside.
    pub fn inside_width(&self, port: &str) -> usize {
        match self.boundary.get(port) {
            Some(index) => self
                .graph
                .edges_directed(*index, Direction::Outgoing)
                .count(),
            None => 0,
        }
    }

    /// Relations linked to a port, in link order.
    pub fn linked_relations(&self, entity: Option<&str>, port: &str) -> Vec<String> {
        let Ok(holder) = self.port_holder(entity, port) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(holder, Direction::Outgoing)
            .filter(|edge| edge.weight().port == port)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(id, _)| id.index());
        edges
            .into_iter()
            .filter_map(|(_, target)| match &self.graph[target] {
                SubgraphNode::Relation { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn contains_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn contains_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn entity_class(&self, name: &str) -> Option<&str> {
        match self.entities.get(name).map(|index| &self.graph[*index]) {
            Some(SubgraphNode::Entity { class, .. }) => Some(class.as_str()),
            _ => None,
        }
    }

    pub fn entity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entities.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn port_holder(&self, entity: Option<&str>, port: &str) -> Result<NodeIndex> {
        match entity {
            None => self
                .boundary
                .get(port)
                .copied()
                .ok_or_else(|| FlowError::PortNotFound(format!("{}.{}", self.name, port))),
            Some(entity_name) => {
                let index = self.entities.get(entity_name).copied().ok_or_else(|| {
                    FlowError::Graph(format!("no entity '{}' in '{}'", entity_name, self.name))
                })?;
                match &self.graph[index] {
                    SubgraphNode::Entity { ports, .. } if ports.iter().any(|p| p == port) => {
                        Ok(index)
                    }
                    _ => Err(FlowError::PortNotFound(format!(
                        "{}.{}.{}",
                        self.name, entity_name, port
                    ))),
                }
            }
        }
    }

    fn relation_index(&self, relation: &str) -> Result<NodeIndex> {
        self.relations.get(relation).copied().ok_or_else(|| {
            FlowError::Graph(format!("no relation '{}' in '{}'", relation, self.name))
        })
    }

    fn emit(&self, event: StructureEvent) {
        for listener in &self.listeners {
            listener.on_structure_event(&self.name, &event);
        }
    }
}

fn qualified_port(entity: Option<&str>, port: &str) -> String {
    match entity {
        Some(entity) => format!("{}.{}", entity, port),
        None => port.to_string(),
    }
}

impl std::fmt::Debug for Subgraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Subgraph {{ name: {}, entities: {}, relations: {}, links: {} }}",
            self.name,
            self.entities.len(),
            self.relations.len(),
            self.graph.edge_count()
        )
    }
}
