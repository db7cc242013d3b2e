// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Project and host configuration.

mod host_config;
mod project_config;

pub use host_config::HostConfig;
pub use project_config::{PackageMetadata, ProjectConfig};
