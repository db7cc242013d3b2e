// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Artifact naming. Names must come out identical across runs, or a
//! previously generated unit is never found again.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::FlowError;

/// Replace every character outside `[A-Za-z0-9_]` with `_`; prefix a
/// leading digit with `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            sanitized.push('_');
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            sanitized.push(c);
        } else {
            sanitized.push('_');
        }
    }
    sanitized
}

/// Base file name for a host: sanitized full name, leading underscore
/// stripped, remaining underscores removed.
pub fn artifact_base_name(full_name: &str) -> String {
    let sanitized = sanitize_name(full_name);
    let stripped = sanitized.strip_prefix('_').unwrap_or(&sanitized);
    stripped.replace('_', "")
}

/// Generator package a unit is produced by. Decides artifact format and
/// which loader binds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorPackage {
    /// Shared library exporting the `lazyflow_unit_*` symbols.
    #[serde(alias = "procedural.native")]
    Native,
    /// JSON manifest naming a unit in the in-process registry.
    #[default]
    #[serde(alias = "procedural.managed")]
    Managed,
}

impl GeneratorPackage {
    pub const NATIVE_ID: &'static str = "procedural.native";
    pub const MANAGED_ID: &'static str = "procedural.managed";
    pub const MANAGED_EXTENSION: &'static str = ".unit.json";

    pub fn identifier(self) -> &'static str {
        match self {
            GeneratorPackage::Native => Self::NATIVE_ID,
            GeneratorPackage::Managed => Self::MANAGED_ID,
        }
    }

    pub fn artifact_file_name(self, base: &str) -> String {
        match self {
            GeneratorPackage::Native => native_file_name(base),
            GeneratorPackage::Managed => format!("{}{}", base, Self::MANAGED_EXTENSION),
        }
    }

    /// Guess the package from an artifact's file name.
    pub fn from_artifact_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        if file_name.ends_with(Self::MANAGED_EXTENSION) {
            return Some(GeneratorPackage::Managed);
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("so") | Some("dylib") | Some("dll") => Some(GeneratorPackage::Native),
            _ => None,
        }
    }
}

impl fmt::Display for GeneratorPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for GeneratorPackage {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" | Self::NATIVE_ID => Ok(GeneratorPackage::Native),
            "managed" | Self::MANAGED_ID => Ok(GeneratorPackage::Managed),
            other => Err(FlowError::Configuration(format!(
                "unknown generator package '{}' (expected {} or {})",
                other,
                Self::NATIVE_ID,
                Self::MANAGED_ID
            ))),
        }
    }
}

/// Platform file name of a native unit.
pub fn native_file_name(base: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.dll", base)
    } else if cfg!(target_os = "macos") {
        format!("lib{}.dylib", base)
    } else {
        format!("lib{}.so", base)
    }
}

/// Resolved name of one host's artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    base: String,
    package: GeneratorPackage,
}

impl ArtifactName {
    /// `disambiguation` is appended when non-zero, so repeated runs without a
    /// model identity do not collide.
    ///
    /// A name with nothing left after sanitizing is rejected.
    pub fn new(
        full_name: &str,
        disambiguation: u64,
        package: GeneratorPackage,
    ) -> crate::core::Result<Self> {
        let base = artifact_base_name(full_name);
        if base.is_empty() {
            return Err(FlowError::Configuration(format!(
                "'{}' has no characters usable in an artifact name",
                full_name
            )));
        }
        Ok(Self { base, package }.disambiguated(disambiguation))
    }

    /// Same name with `disambiguation` appended. Call on the name built
    /// with no disambiguation.
    pub fn disambiguated(&self, disambiguation: u64) -> Self {
        let mut base = self.base.clone();
        if disambiguation > 0 {
            base.push_str(&disambiguation.to_string());
        }
        Self {
            base,
            package: self.package,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn package(&self) -> GeneratorPackage {
        self.package
    }

    pub fn file_name(&self) -> String {
        self.package.artifact_file_name(&self.base)
    }

    pub fn path_in(&self, directory: &Path) -> PathBuf {
        directory.join(self.file_name())
    }

    pub fn profile_file_name(&self) -> String {
        format!("{}_profile.json", self.base)
    }

    pub fn profile_path_in(&self, directory: &Path) -> PathBuf {
        directory.join(self.profile_file_name())
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name(".top.Composite 1"), "_top_Composite_1");
        assert_eq!(sanitize_name("3d-filter"), "_3d_filter");
        assert_eq!(sanitize_name("plain_name"), "plain_name");
    }

    #[test]
    fn test_artifact_base_name_drops_separators() {
        assert_eq!(artifact_base_name(".model.sub_level.CG"), "modelsublevelCG");
        assert_eq!(artifact_base_name("_x"), "x");
    }

    #[test]
    fn test_disambiguation_suffix() {
        let name = ArtifactName::new(".model.cg", 0, GeneratorPackage::Managed).unwrap();
        assert_eq!(name.file_name(), "modelcg.unit.json");

        let name = ArtifactName::new(".model.cg", 3, GeneratorPackage::Managed).unwrap();
        assert_eq!(name.base(), "modelcg3");
        assert_eq!(name.profile_file_name(), "modelcg3_profile.json");
    }

    #[test]
    fn test_separator_only_names_are_rejected() {
        for name in [".", "_", "..", "-_-", ""] {
            assert!(matches!(
                ArtifactName::new(name, 0, GeneratorPackage::Managed),
                Err(FlowError::Configuration(_))
            ));
        }
        assert_eq!(
            ArtifactName::new("._a", 0, GeneratorPackage::Managed)
                .unwrap()
                .base(),
            "a"
        );
    }

    #[test]
    fn test_native_file_name_follows_platform() {
        let name = ArtifactName::new(".model.cg", 0, GeneratorPackage::Native).unwrap();
        #[cfg(target_os = "linux")]
        assert_eq!(name.file_name(), "libmodelcg.so");
        #[cfg(target_os = "macos")]
        assert_eq!(name.file_name(), "libmodelcg.dylib");
        #[cfg(target_os = "windows")]
        assert_eq!(name.file_name(), "modelcg.dll");
    }

    #[test]
    fn test_package_parsing() {
        assert_eq!(
            "procedural.native".parse::<GeneratorPackage>().unwrap(),
            GeneratorPackage::Native
        );
        assert_eq!(
            "managed".parse::<GeneratorPackage>().unwrap(),
            GeneratorPackage::Managed
        );
        assert!(matches!(
            "procedural.java".parse::<GeneratorPackage>(),
            Err(FlowError::Configuration(_))
        ));
    }

    #[test]
    fn test_package_from_artifact_path() {
        assert_eq!(
            GeneratorPackage::from_artifact_path(Path::new("/cg/top.unit.json")),
            Some(GeneratorPackage::Managed)
        );
        assert_eq!(
            GeneratorPackage::from_artifact_path(Path::new("/cg/libtop.so")),
            Some(GeneratorPackage::Native)
        );
        assert_eq!(
            GeneratorPackage::from_artifact_path(Path::new("/cg/top.txt")),
            None
        );
    }
}
