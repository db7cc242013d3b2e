// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The lazy composite host: deferred population, staleness-driven
//! regeneration, and rebinding of compiled units.

mod builder;
mod flags;
mod lazy_host;
mod state;
mod tracker;

pub use builder::HostBuilder;
pub use flags::RecompileFlags;
pub use lazy_host::LazyCompositeHost;
pub use state::HostState;
pub use tracker::RecompileTracker;

pub(crate) use lazy_host::HostParts;
