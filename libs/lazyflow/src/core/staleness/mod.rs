// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Recompile-or-reuse decision for generated artifacts.

mod oracle;

pub use oracle::{StalenessInputs, StalenessOracle, StalenessReason, StalenessVerdict};
