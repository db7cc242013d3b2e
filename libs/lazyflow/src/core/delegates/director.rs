// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::marshal::Token;
use crate::core::Result;

/// Token I/O primitives supplied by the enclosing execution director.
///
/// Reads are synchronous; whether `get` may block is up to the director.
pub trait PortIo {
    /// True if `count` tokens can be read from `channel` of `port`.
    fn has_tokens(&self, port: &str, channel: usize, count: usize) -> bool;

    fn get(&mut self, port: &str, channel: usize) -> Result<Token>;

    fn send(&mut self, port: &str, channel: usize, token: Token) -> Result<()>;
}

/// Hook into the enclosing director's cached schedule and resolved types.
pub trait ScheduleInvalidator: Send + Sync {
    fn invalidate_schedule(&self);

    fn invalidate_resolved_types(&self);
}

/// Invalidator for hosts that are not driven by a scheduling director.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl ScheduleInvalidator for NoopInvalidator {
    fn invalidate_schedule(&self) {}

    fn invalidate_resolved_types(&self) {}
}
