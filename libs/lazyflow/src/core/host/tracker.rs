// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::graph::{StructureEvent, StructureListener};
use crate::core::host::RecompileFlags;
use crate::core::profile::Profile;
use crate::core::pubsub::{ReentrancyCounter, ReentrancyGuard};

/// Turns structure events into "this level changed".
///
/// Events raised while the host populates, generates, or rearranges pub/sub
/// stubs are its own doing and are ignored.
#[derive(Debug)]
pub struct RecompileTracker {
    flags: Arc<RecompileFlags>,
    pubsub: ReentrancyCounter,
    populating: ReentrancyCounter,
    generating: ReentrancyCounter,
    profile: Mutex<Option<Arc<Profile>>>,
}

impl RecompileTracker {
    pub fn new(flags: Arc<RecompileFlags>, pubsub: ReentrancyCounter) -> Self {
        Self {
            flags,
            pubsub,
            populating: ReentrancyCounter::new(),
            generating: ReentrancyCounter::new(),
            profile: Mutex::new(None),
        }
    }

    pub fn flags(&self) -> &Arc<RecompileFlags> {
        &self.flags
    }

    pub fn pubsub_guard(&self) -> &ReentrancyCounter {
        &self.pubsub
    }

    pub fn populating(&self) -> ReentrancyGuard {
        self.populating.enter()
    }

    pub fn generating(&self) -> ReentrancyGuard {
        self.generating.enter()
    }

    pub fn is_suppressed(&self) -> bool {
        self.populating.is_active() || self.generating.is_active() || self.pubsub.is_active()
    }

    /// Set "this level changed" and drop the cached profile, unless
    /// suppressed. Returns whether the flag was set.
    pub fn mark_changed(&self) -> bool {
        if self.is_suppressed() {
            return false;
        }
        self.flags.set_this_level(true);
        *self.profile.lock() = None;
        true
    }

    pub fn cached_profile(&self) -> Option<Arc<Profile>> {
        self.profile.lock().clone()
    }

    pub fn set_profile(&self, profile: Option<Arc<Profile>>) {
        *self.profile.lock() = profile;
    }
}

impl StructureListener for RecompileTracker {
    fn on_structure_event(&self, source: &str, event: &StructureEvent) {
        if self.mark_changed() {
            tracing::debug!("[host] '{}' changed: {:?}", source, event);
        }
    }
}
