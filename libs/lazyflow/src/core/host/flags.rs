// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// "This level changed" and "hierarchy changed" for one host.
///
/// Flags form a tree mirroring host nesting. Setting `hierarchy` cascades to
/// every contained host before returning, and a host also counts as changed
/// while any ancestor has `hierarchy` set.
#[derive(Debug)]
pub struct RecompileFlags {
    this_level: AtomicBool,
    hierarchy: AtomicBool,
    parent: Option<Arc<RecompileFlags>>,
    children: Mutex<Vec<Weak<RecompileFlags>>>,
}

impl RecompileFlags {
    pub fn root(this_level: bool, hierarchy: bool) -> Arc<Self> {
        Arc::new(Self {
            this_level: AtomicBool::new(this_level),
            hierarchy: AtomicBool::new(hierarchy),
            parent: None,
            children: Mutex::new(Vec::new()),
        })
    }

    /// Flags for a host nested in `parent`'s host. Inherits a pending
    /// hierarchy recompile.
    pub fn child_of(parent: &Arc<Self>, this_level: bool, hierarchy: bool) -> Arc<Self> {
        let child = Arc::new(Self {
            this_level: AtomicBool::new(this_level),
            hierarchy: AtomicBool::new(hierarchy || parent.hierarchy()),
            parent: Some(Arc::clone(parent)),
            children: Mutex::new(Vec::new()),
        });
        let mut children = parent.children.lock();
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&child));
        drop(children);
        child
    }

    pub fn this_level(&self) -> bool {
        self.this_level.load(Ordering::SeqCst)
    }

    pub fn hierarchy(&self) -> bool {
        self.hierarchy.load(Ordering::SeqCst)
    }

    pub fn set_this_level(&self, value: bool) {
        self.this_level.store(value, Ordering::SeqCst);
    }

    pub fn set_hierarchy(&self, value: bool) {
        self.hierarchy.store(value, Ordering::SeqCst);
        if value {
            let children: Vec<Arc<RecompileFlags>> = self
                .children
                .lock()
                .iter()
                .filter_map(Weak::upgrade)
                .collect();
            for child in children {
                child.set_hierarchy(true);
            }
        }
    }

    /// Recompile needed at this level, for this whole hierarchy, or for an
    /// enclosing hierarchy.
    pub fn model_changed(&self) -> bool {
        if self.this_level() || self.hierarchy() {
            return true;
        }
        let mut ancestor = self.parent.as_ref();
        while let Some(flags) = ancestor {
            if flags.hierarchy() {
                return true;
            }
            ancestor = flags.parent.as_ref();
        }
        false
    }

    /// Only after a successful regenerate and rebind.
    pub fn clear(&self) {
        self.this_level.store(false, Ordering::SeqCst);
        self.hierarchy.store(false, Ordering::SeqCst);
    }
}
