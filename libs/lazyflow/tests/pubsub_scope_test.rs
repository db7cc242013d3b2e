// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Named channels across nested hosts.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{scale_description, Fixture};
use lazyflow::core::pubsub::{ChannelState, PubSubScope, ReentrancyCounter};
use lazyflow::core::{BoundaryPort, PortType, ScheduleInvalidator, SubgraphDescription};
use lazyflow::{FlowError, HostState};

#[derive(Default)]
struct CountingInvalidator {
    schedules: AtomicUsize,
    types: AtomicUsize,
}

impl ScheduleInvalidator for CountingInvalidator {
    fn invalidate_schedule(&self) {
        self.schedules.fetch_add(1, Ordering::SeqCst);
    }

    fn invalidate_resolved_types(&self) {
        self.types.fetch_add(1, Ordering::SeqCst);
    }
}

fn publishing(channel: &str) -> SubgraphDescription {
    scale_description().with_port(BoundaryPort::output("announce", PortType::Int).publisher(channel))
}

fn subscribing(channel: &str) -> SubgraphDescription {
    scale_description().with_port(BoundaryPort::input("listen", PortType::Int).subscriber(channel))
}

#[test]
fn test_second_publisher_in_scope_is_rejected() {
    let fx = Fixture::new();
    let parent = fx.builder(".model", scale_description()).build().unwrap();

    let mut first = fx
        .builder(".model.a", publishing("topicA"))
        .parent(&parent)
        .build()
        .unwrap();
    let mut second = fx
        .builder(".model.b", publishing("topicA"))
        .parent(&parent)
        .build()
        .unwrap();

    first.preinitialize().unwrap();
    let err = second.preinitialize().unwrap_err();
    assert!(matches!(
        err,
        FlowError::DuplicateChannel { ref channel, .. } if channel == "topicA"
    ));
    match parent.scope().lookup("topicA") {
        ChannelState::Published { publisher, .. } => assert_eq!(publisher, ".model.a.announce"),
        other => panic!("first registration lost: {:?}", other),
    }
}

#[test]
fn test_nested_registration_does_not_mark_recompile() {
    let fx = Fixture::new();
    let parent = fx.builder(".model", scale_description()).build().unwrap();
    let mut child = fx
        .builder(".model.a", publishing("topicA"))
        .parent(&parent)
        .build()
        .unwrap();

    child.preinitialize().unwrap();
    assert!(matches!(
        parent.scope().lookup("topicA"),
        ChannelState::Published { .. }
    ));
    assert!(!parent.flags().this_level());
}

#[test]
fn test_subscriber_waits_for_publisher() {
    let fx = Fixture::new();
    let parent = fx.builder(".model", scale_description()).build().unwrap();
    let mut listener = fx
        .builder(".model.listener", subscribing("topicA"))
        .parent(&parent)
        .build()
        .unwrap();
    let mut talker = fx
        .builder(".model.talker", publishing("topicA"))
        .parent(&parent)
        .build()
        .unwrap();

    listener.preinitialize().unwrap();
    assert!(matches!(
        parent.scope().lookup("topicA"),
        ChannelState::AwaitingPublisher { .. }
    ));

    talker.preinitialize().unwrap();
    match parent.scope().lookup("topicA") {
        ChannelState::Published {
            publisher,
            subscribers,
        } => {
            assert_eq!(publisher, ".model.talker.announce");
            assert_eq!(subscribers, vec![".model.listener.listen".to_string()]);
        }
        other => panic!("expected a published channel, got {:?}", other),
    }
}

#[test]
fn test_wrapup_releases_channels() {
    let fx = Fixture::new();
    let parent = fx.builder(".model", scale_description()).build().unwrap();
    let mut child = fx
        .builder(".model.a", publishing("topicA"))
        .parent(&parent)
        .build()
        .unwrap();

    child.preinitialize().unwrap();
    child.initialize().unwrap();
    child.wrapup().unwrap();

    assert_eq!(parent.scope().lookup("topicA"), ChannelState::Unregistered);

    // A second run registers again without tripping over the first.
    child.preinitialize().unwrap();
    assert!(matches!(
        parent.scope().lookup("topicA"),
        ChannelState::Published { .. }
    ));
}

#[test]
fn test_unresolved_channel_forwards_to_enclosing_scope() {
    let root = Arc::new(PubSubScope::root("top"));
    let invalidator = Arc::new(CountingInvalidator::default());
    let middle = Arc::new(PubSubScope::new(
        "top.middle",
        Some(root.clone()),
        ReentrancyCounter::new(),
        invalidator.clone(),
    ));

    middle.register_publisher("topicA", "source.output").unwrap();
    let stub = middle.stub_port("topicA").unwrap();
    match root.lookup("topicA") {
        ChannelState::Published { publisher, .. } => {
            assert_eq!(publisher, format!("top.middle.{}", stub));
        }
        other => panic!("expected forwarding to the root, got {:?}", other),
    }
    assert!(invalidator.schedules.load(Ordering::SeqCst) >= 1);
    assert!(invalidator.types.load(Ordering::SeqCst) >= 1);

    middle.unregister_publisher("topicA", "source.output").unwrap();
    assert_eq!(root.lookup("topicA"), ChannelState::Unregistered);
}

#[test]
fn test_unlink_unknown_subscriber_is_noop() {
    let scope = PubSubScope::root("top");
    scope.unlink_subscriber("nobody", "sink.input").unwrap();
    assert_eq!(scope.lookup("nobody"), ChannelState::Unregistered);
}

#[test]
fn test_inner_publisher_is_replayed_from_profile() {
    let fx = Fixture::new();
    let parent = fx.builder(".model", scale_description()).build().unwrap();
    {
        let mut first = fx
            .builder(".model.a", scale_description())
            .parent(&parent)
            .build()
            .unwrap();
        first.populate().unwrap();
        first.scope().register_publisher("topicA", "gain.output").unwrap();
        first.preinitialize().unwrap();
        first.initialize().unwrap();
        assert_eq!(first.state(), HostState::Bound);
        // The inner scope already forwards the channel; no second registration.
        assert!(matches!(
            parent.scope().lookup("topicA"),
            ChannelState::Published { .. }
        ));
        first.wrapup().unwrap();
        first.scope().unregister_publisher("topicA", "gain.output").unwrap();
    }
    assert_eq!(parent.scope().lookup("topicA"), ChannelState::Unregistered);

    let mut second = fx
        .builder(".model.a", scale_description())
        .parent(&parent)
        .build()
        .unwrap();
    second.preinitialize().unwrap();
    assert_eq!(second.state(), HostState::Profiled);
    assert!(!second.is_populated());

    let hidden = second.ports().iter().find(|p| p.hidden).unwrap().clone();
    assert!(hidden.is_output());
    assert_eq!(hidden.pub_sub.as_ref().unwrap().channel, "topicA");
    match parent.scope().lookup("topicA") {
        ChannelState::Published { publisher, .. } => {
            assert_eq!(publisher, format!(".model.a.{}", hidden.name));
        }
        other => panic!("replayed publisher missing: {:?}", other),
    }

    second.initialize().unwrap();
    assert_eq!(fx.generations(), 1);
    second.wrapup().unwrap();
    assert_eq!(parent.scope().lookup("topicA"), ChannelState::Unregistered);
}

#[test]
fn test_inner_subscriber_is_replayed_from_profile() {
    let fx = Fixture::new();
    let parent = fx.builder(".model", scale_description()).build().unwrap();
    {
        let mut first = fx
            .builder(".model.b", scale_description())
            .parent(&parent)
            .build()
            .unwrap();
        first.populate().unwrap();
        first.scope().link_to_subscriber("topicB", "gain.input").unwrap();
        first.preinitialize().unwrap();
        first.initialize().unwrap();
        first.wrapup().unwrap();
        first.scope().unlink_subscriber("topicB", "gain.input").unwrap();
    }

    let mut second = fx
        .builder(".model.b", scale_description())
        .parent(&parent)
        .build()
        .unwrap();
    second.preinitialize().unwrap();
    let hidden = second.ports().iter().find(|p| p.hidden).unwrap().clone();
    assert!(hidden.is_input());
    match parent.scope().lookup("topicB") {
        ChannelState::AwaitingPublisher { subscribers } => {
            assert_eq!(subscribers, vec![format!(".model.b.{}", hidden.name)]);
        }
        other => panic!("replayed subscriber missing: {:?}", other),
    }
}
