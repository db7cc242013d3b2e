// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Named-channel links between modular composites, realised with hidden
//! stub ports and relations.

mod guard;
mod scope;

pub use guard::{ReentrancyCounter, ReentrancyGuard};
pub use scope::{ChannelState, PubSubScope};
