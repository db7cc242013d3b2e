// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::delegates::{NoopInvalidator, ScheduleInvalidator};
use crate::core::graph::{StructureEvent, StructureListener};
use crate::core::pubsub::ReentrancyCounter;
use crate::core::{FlowError, Result};

/// Observable state of one channel name at one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    Unregistered,
    /// A publisher is registered; subscribers are linked to it directly.
    Published {
        publisher: String,
        subscribers: Vec<String>,
    },
    /// Subscribers wait on a stub until a publisher appears.
    AwaitingPublisher { subscribers: Vec<String> },
}

#[derive(Debug, Clone, Copy)]
enum StubKind {
    Publisher,
    Subscriber,
}

/// Hidden, non-persistent port and relation proxying a channel.
#[derive(Debug)]
struct Stub {
    port: String,
    relation: String,
    attached: bool,
}

impl Stub {
    fn creation_events(&self) -> [StructureEvent; 2] {
        [
            StructureEvent::PortAdded {
                port: self.port.clone(),
            },
            StructureEvent::RelationAdded {
                relation: self.relation.clone(),
            },
        ]
    }

    fn teardown_events(&self) -> [StructureEvent; 2] {
        [
            StructureEvent::RelationRemoved {
                relation: self.relation.clone(),
            },
            StructureEvent::PortRemoved {
                port: self.port.clone(),
            },
        ]
    }
}

#[derive(Debug)]
struct PublisherEntry {
    port: String,
    stub: Stub,
    subscribers: Vec<String>,
}

#[derive(Debug)]
struct SubscriberStub {
    stub: Stub,
    subscribers: Vec<String>,
}

#[derive(Debug, Default)]
struct ScopeState {
    publishers: HashMap<String, PublisherEntry>,
    pending: HashMap<String, SubscriberStub>,
    stub_counter: u64,
}

impl ScopeState {
    fn new_stub(&mut self, kind: StubKind) -> Stub {
        self.stub_counter += 1;
        let prefix = match kind {
            StubKind::Publisher => "publisherStub",
            StubKind::Subscriber => "subscriberStub",
        };
        Stub {
            port: format!("{}Port{}", prefix, self.stub_counter),
            relation: format!("{}Relation{}", prefix, self.stub_counter),
            attached: true,
        }
    }

    fn stub_mut(&mut self, port: &str) -> Option<&mut Stub> {
        self.publishers
            .values_mut()
            .map(|entry| &mut entry.stub)
            .chain(self.pending.values_mut().map(|entry| &mut entry.stub))
            .find(|stub| stub.port == port)
    }

    fn channel_state(&self, channel: &str) -> ChannelState {
        if let Some(entry) = self.publishers.get(channel) {
            ChannelState::Published {
                publisher: entry.port.clone(),
                subscribers: entry.subscribers.clone(),
            }
        } else if let Some(pending) = self.pending.get(channel) {
            ChannelState::AwaitingPublisher {
                subscribers: pending.subscribers.clone(),
            }
        } else {
            ChannelState::Unregistered
        }
    }
}

/// Publish/subscribe registry of one container.
///
/// Channels are matched by name. Registrations and links that cannot be
/// resolved at this scope are forwarded to the parent scope through this
/// scope's own stub port, so channels connect across any nesting depth.
/// Every transition holds the reentrancy guard while it emits structure
/// events, then invalidates the director's schedule and resolved types.
pub struct PubSubScope {
    name: String,
    parent: Option<Arc<PubSubScope>>,
    guard: ReentrancyCounter,
    invalidator: Arc<dyn ScheduleInvalidator>,
    state: Mutex<ScopeState>,
    listeners: Mutex<Vec<Arc<dyn StructureListener>>>,
}

impl PubSubScope {
    pub fn new(
        name: impl Into<String>,
        parent: Option<Arc<PubSubScope>>,
        guard: ReentrancyCounter,
        invalidator: Arc<dyn ScheduleInvalidator>,
    ) -> Self {
        Self {
            name: name.into(),
            parent,
            guard,
            invalidator,
            state: Mutex::new(ScopeState::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Top-level scope with no director to invalidate.
    pub fn root(name: impl Into<String>) -> Self {
        Self::new(
            name,
            None,
            ReentrancyCounter::new(),
            Arc::new(NoopInvalidator),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<PubSubScope>> {
        self.parent.as_ref()
    }

    pub fn guard(&self) -> &ReentrancyCounter {
        &self.guard
    }

    pub fn add_listener(&self, listener: Arc<dyn StructureListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn register_publisher(&self, channel: &str, port: &str) -> Result<()> {
        let _active = self.guard.enter();
        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            if state.publishers.contains_key(channel) {
                return Err(FlowError::DuplicateChannel {
                    channel: channel.to_string(),
                    scope: self.name.clone(),
                });
            }

            let stub = state.new_stub(StubKind::Publisher);
            if let Some(parent) = &self.parent {
                parent.register_publisher(channel, &self.qualify(&stub.port))?;
            }
            events.extend(stub.creation_events());
            events.push(StructureEvent::ConnectionsChanged {
                port: port.to_string(),
            });

            let mut subscribers = Vec::new();
            if let Some(pending) = state.pending.remove(channel) {
                tracing::debug!(
                    "[pubsub] '{}' in '{}': publisher arrived after {} subscriber(s)",
                    channel,
                    self.name,
                    pending.subscribers.len()
                );
                if let Some(parent) = &self.parent {
                    if let Err(e) =
                        parent.unlink_subscriber(channel, &self.qualify(&pending.stub.port))
                    {
                        tracing::warn!("[pubsub] releasing upstream subscriber stub: {}", e);
                    }
                }
                events.extend(pending.stub.teardown_events());
                events.extend(pending.subscribers.iter().map(|s| {
                    StructureEvent::ConnectionsChanged { port: s.clone() }
                }));
                subscribers = pending.subscribers;
            }

            tracing::debug!(
                "[pubsub] '{}' in '{}': publisher '{}' via {}",
                channel,
                self.name,
                port,
                stub.port
            );
            state.publishers.insert(
                channel.to_string(),
                PublisherEntry {
                    port: port.to_string(),
                    stub,
                    subscribers,
                },
            );
        }
        self.finish(events);
        Ok(())
    }

    pub fn unregister_publisher(&self, channel: &str, port: &str) -> Result<()> {
        let _active = self.guard.enter();
        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            let stub_port = match state.publishers.get(channel) {
                Some(entry) if entry.port == port => entry.stub.port.clone(),
                _ => {
                    return Err(FlowError::PortNotFound(format!(
                        "'{}' is not the publisher of channel '{}' in '{}'",
                        port, channel, self.name
                    )));
                }
            };
            if let Some(parent) = &self.parent {
                parent.unregister_publisher(channel, &self.qualify(&stub_port))?;
            }

            let Some(entry) = state.publishers.remove(channel) else {
                return Ok(());
            };
            events.extend(entry.stub.teardown_events());
            events.push(StructureEvent::ConnectionsChanged {
                port: port.to_string(),
            });

            if !entry.subscribers.is_empty() {
                let stub = state.new_stub(StubKind::Subscriber);
                if let Some(parent) = &self.parent {
                    if let Err(e) = parent.link_to_subscriber(channel, &self.qualify(&stub.port)) {
                        tracing::warn!("[pubsub] relinking orphaned subscribers upstream: {}", e);
                    }
                }
                events.extend(stub.creation_events());
                state.pending.insert(
                    channel.to_string(),
                    SubscriberStub {
                        stub,
                        subscribers: entry.subscribers,
                    },
                );
            }
            tracing::debug!("[pubsub] '{}' in '{}': publisher removed", channel, self.name);
        }
        self.finish(events);
        Ok(())
    }

    pub fn link_to_subscriber(&self, channel: &str, port: &str) -> Result<()> {
        let _active = self.guard.enter();
        let mut events = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some(entry) = state.publishers.get_mut(channel) {
                if !entry.subscribers.iter().any(|s| s == port) {
                    entry.subscribers.push(port.to_string());
                }
            } else if let Some(pending) = state.pending.get_mut(channel) {
                if !pending.stub.attached {
                    tracing::info!(
                        "[pubsub] '{}' in '{}': re-attaching deleted stub {}",
                        channel,
                        self.name,
                        pending.stub.port
                    );
                    pending.stub.attached = true;
                    events.extend(pending.stub.creation_events());
                }
                if !pending.subscribers.iter().any(|s| s == port) {
                    pending.subscribers.push(port.to_string());
                }
            } else {
                let stub = state.new_stub(StubKind::Subscriber);
                if let Some(parent) = &self.parent {
                    parent.link_to_subscriber(channel, &self.qualify(&stub.port))?;
                }
                events.extend(stub.creation_events());
                state.pending.insert(
                    channel.to_string(),
                    SubscriberStub {
                        stub,
                        subscribers: vec![port.to_string()],
                    },
                );
            }

            // A publisher stub can also have been deleted under us.
            if let Some(entry) = state.publishers.get_mut(channel) {
                if !entry.stub.attached {
                    entry.stub.attached = true;
                    events.extend(entry.stub.creation_events());
                }
            }
        }
        events.push(StructureEvent::ConnectionsChanged {
            port: port.to_string(),
        });
        self.finish(events);
        Ok(())
    }

    /// Unlinking a subscriber the scope does not know is a no-op.
    pub fn unlink_subscriber(&self, channel: &str, port: &str) -> Result<()> {
        let _active = self.guard.enter();
        let mut events = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let mut release_stub = false;
            if let Some(entry) = state.publishers.get_mut(channel) {
                if remove_item(&mut entry.subscribers, port) {
                    events.push(StructureEvent::ConnectionsChanged {
                        port: port.to_string(),
                    });
                }
            } else if let Some(pending) = state.pending.get_mut(channel) {
                if remove_item(&mut pending.subscribers, port) {
                    events.push(StructureEvent::ConnectionsChanged {
                        port: port.to_string(),
                    });
                    release_stub = pending.subscribers.is_empty();
                }
            }

            if release_stub {
                if let Some(pending) = state.pending.remove(channel) {
                    if let Some(parent) = &self.parent {
                        parent.unlink_subscriber(channel, &self.qualify(&pending.stub.port))?;
                    }
                    events.extend(pending.stub.teardown_events());
                    tracing::debug!(
                        "[pubsub] '{}' in '{}': last subscriber gone",
                        channel,
                        self.name
                    );
                }
            }
        }
        if events.is_empty() {
            return Ok(());
        }
        self.finish(events);
        Ok(())
    }

    /// Mark a stub port as deleted from the topology. The next link through
    /// its channel re-attaches it.
    pub fn detach_port(&self, port: &str) -> bool {
        let _active = self.guard.enter();
        let detached = {
            let mut state = self.state.lock();
            match state.stub_mut(port) {
                Some(stub) if stub.attached => {
                    stub.attached = false;
                    true
                }
                _ => false,
            }
        };
        if detached {
            self.finish(vec![StructureEvent::PortRemoved {
                port: port.to_string(),
            }]);
        }
        detached
    }

    pub fn lookup(&self, channel: &str) -> ChannelState {
        self.state.lock().channel_state(channel)
    }

    /// Every registered channel and its state.
    pub fn channels(&self) -> BTreeMap<String, ChannelState> {
        let state = self.state.lock();
        state
            .publishers
            .keys()
            .chain(state.pending.keys())
            .map(|channel| (channel.clone(), state.channel_state(channel)))
            .collect()
    }

    /// Name of the stub port currently proxying `channel` at this scope.
    pub fn stub_port(&self, channel: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .publishers
            .get(channel)
            .map(|entry| entry.stub.port.clone())
            .or_else(|| state.pending.get(channel).map(|p| p.stub.port.clone()))
    }

    pub fn is_stub_attached(&self, channel: &str) -> Option<bool> {
        let state = self.state.lock();
        state
            .publishers
            .get(channel)
            .map(|entry| entry.stub.attached)
            .or_else(|| state.pending.get(channel).map(|p| p.stub.attached))
    }

    fn qualify(&self, port: &str) -> String {
        format!("{}.{}", self.name, port)
    }

    fn finish(&self, events: Vec<StructureEvent>) {
        let listeners = self.listeners.lock().clone();
        for event in &events {
            for listener in &listeners {
                listener.on_structure_event(&self.name, event);
            }
        }
        self.invalidator.invalidate_schedule();
        self.invalidator.invalidate_resolved_types();
    }
}

fn remove_item(items: &mut Vec<String>, item: &str) -> bool {
    let before = items.len();
    items.retain(|i| i != item);
    items.len() != before
}

impl std::fmt::Debug for PubSubScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubScope")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("channels", &self.channels())
            .finish()
    }
}
