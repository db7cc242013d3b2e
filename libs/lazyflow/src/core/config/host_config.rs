// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::binding::GeneratorPackage;
use crate::core::lazyflow_home::default_code_directory;

/// Per-host settings for the compiled execution path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory generated units are written to and bound from.
    pub code_directory: PathBuf,

    /// Which generator package (and therefore which loader) produces units.
    pub generator_package: GeneratorPackage,

    /// When false the host never generates or binds and always runs the
    /// interpreted subgraph.
    pub execute_compiled: bool,

    /// Read and trust persisted profiles instead of materializing the subgraph.
    pub use_profile: bool,

    /// Let the generator overwrite existing source files.
    pub overwrite_files: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            code_directory: default_code_directory(),
            generator_package: GeneratorPackage::default(),
            execute_compiled: true,
            use_profile: true,
            overwrite_files: true,
        }
    }
}

impl HostConfig {
    pub fn with_code_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.code_directory = dir.into();
        self
    }

    pub fn with_generator_package(mut self, package: GeneratorPackage) -> Self {
        self.generator_package = package;
        self
    }

    pub fn with_execute_compiled(mut self, execute_compiled: bool) -> Self {
        self.execute_compiled = execute_compiled;
        self
    }

    pub fn with_use_profile(mut self, use_profile: bool) -> Self {
        self.use_profile = use_profile;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert!(config.execute_compiled);
        assert!(config.use_profile);
        assert!(config.overwrite_files);
        assert_eq!(config.generator_package, GeneratorPackage::Managed);
        assert!(config.code_directory.ends_with("cg"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: HostConfig = serde_yaml::from_str(
            r#"
code_directory: /opt/units
generator_package: native
use_profile: false
"#,
        )
        .unwrap();
        assert_eq!(config.code_directory, PathBuf::from("/opt/units"));
        assert_eq!(config.generator_package, GeneratorPackage::Native);
        assert!(!config.use_profile);
        assert!(config.execute_compiled);
    }
}
