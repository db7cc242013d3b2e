// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Project-level configuration via `lazyflow.yaml`.

use std::path::Path;

use serde::Deserialize;

use crate::core::config::HostConfig;
use crate::core::{FlowError, Result};

/// Package-level metadata from `lazyflow.yaml`.
#[derive(Debug, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Project configuration from `lazyflow.yaml`.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub package: Option<PackageMetadata>,

    /// Defaults applied to every host in the project.
    #[serde(default)]
    pub host: HostConfig,
}

impl ProjectConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "lazyflow.yaml";

    /// Load project configuration from a directory. Returns error if file is
    /// missing or cannot be parsed.
    pub fn load(project_path: &Path) -> Result<Self> {
        let config_path = project_path.join(Self::FILE_NAME);

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            FlowError::Configuration(format!("Failed to read {}: {}", config_path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            FlowError::Configuration(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;

        tracing::info!("Loaded project config from {}", config_path.display());
        Ok(config)
    }

    /// Load project configuration from a directory, returning defaults if the
    /// file is missing or unparseable.
    pub fn load_or_default(project_path: &Path) -> Self {
        let config_path = project_path.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(
                "No {} found in {}, using defaults",
                Self::FILE_NAME,
                project_path.display()
            );
            return Self::default();
        }

        match Self::load(project_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::binding::GeneratorPackage;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_returns_error() {
        let dir = TempDir::new().unwrap();
        let result = ProjectConfig::load(dir.path());
        assert!(matches!(result, Err(FlowError::Configuration(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::load_or_default(dir.path());
        assert!(config.package.is_none());
        assert!(config.host.execute_compiled);
    }

    #[test]
    fn test_load_or_default_unparseable_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("lazyflow.yaml"), "host: [not, a, map]").unwrap();
        let config = ProjectConfig::load_or_default(dir.path());
        assert!(config.package.is_none());
    }

    #[test]
    fn test_load_with_host_section() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("lazyflow.yaml"),
            r#"
package:
  name: filters
  version: "0.2.0"

host:
  code_directory: build/cg
  generator_package: procedural.native
  execute_compiled: false
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        let package = config.package.unwrap();
        assert_eq!(package.name, "filters");
        assert_eq!(config.host.generator_package, GeneratorPackage::Native);
        assert!(!config.host.execute_compiled);
        assert!(config.host.overwrite_files);
    }
}
