// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Depth counter for "the fabric is rearranging stubs".
///
/// Shared between a scope and the recompile tracker of the host that owns
/// it, so structure events raised by stub construction are recognised as
/// self-inflicted.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyCounter(Arc<AtomicUsize>);

impl ReentrancyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> ReentrancyGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        ReentrancyGuard {
            counter: Arc::clone(&self.0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    pub fn depth(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Held for the whole of one fabric transition.
#[must_use = "the guard is released as soon as it is dropped"]
#[derive(Debug)]
pub struct ReentrancyGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
