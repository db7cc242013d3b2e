// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Delegate traits for the collaborators a host drives but does not own.
//!
//! - Generator: emits and builds a unit from a subgraph description
//! - Identity: reports whether the model is modified and where it lives
//! - Executor: interpreted composite semantics used as the fallback
//! - Director: token I/O and schedule invalidation

mod director;
mod executor;
mod generator;
mod identity;

pub use director::{NoopInvalidator, PortIo, ScheduleInvalidator};
pub use executor::{NoInterpreter, SubgraphExecutor};
pub use generator::{CodeGenerator, GenerationRequest};
pub use identity::{FileModelIdentity, ModelIdentity};
