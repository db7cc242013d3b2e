// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use lazyflow::core::binding::{loader_for, EntryPoint};
use lazyflow::{GeneratorPackage, Profile};

/// Open `artifact` with its package's loader and report what binding would
/// see. The unit itself is never instantiated.
pub fn run(artifact: &Path) -> Result<()> {
    let package = GeneratorPackage::from_artifact_path(artifact).ok_or_else(|| {
        anyhow!(
            "{} is neither a native library nor a *{} manifest",
            artifact.display(),
            GeneratorPackage::MANAGED_EXTENSION
        )
    })?;
    tracing::debug!("[inspect] {} looks like {}", artifact.display(), package);

    let loader = loader_for(package);
    let opened = loader
        .open(artifact)
        .with_context(|| format!("Failed to open {}", artifact.display()))?;

    println!("{}", artifact.display());
    println!("  Package:     {}", package);
    match opened.abi_version() {
        Ok(version) => println!("  ABI version: {}", version),
        Err(e) => println!("  ABI version: unavailable ({})", e),
    }
    println!("  Entry points:");
    for entry_point in EntryPoint::REQUIRED {
        let mark = if opened.exports(entry_point) { "ok" } else { "missing" };
        println!("    - {:<10} {}", entry_point.name(), mark);
    }

    match profile_path(artifact, package) {
        Some(path) if path.exists() => {
            let profile = Profile::load(&path)
                .with_context(|| format!("Failed to read profile {}", path.display()))?;
            println!("  Profile:     {}", path.display());
            println!("    Unit:        {}", profile.unit_name());
            println!("    Fingerprint: {}", profile.fingerprint());
            if let Some(directory) = profile.artifact_directory() {
                println!("    Artifacts:   {}", directory.display());
            }
            for port in profile.ports() {
                let json = serde_json::to_string(port)?;
                println!("    {}", json);
            }
        }
        _ => println!("  Profile:     none"),
    }

    Ok(())
}

/// `<dir>/<base>_profile.json` for an artifact at `<dir>/<file>`.
fn profile_path(artifact: &Path, package: GeneratorPackage) -> Option<PathBuf> {
    let file_name = artifact.file_name()?.to_str()?;
    let base = match package {
        GeneratorPackage::Managed => file_name.strip_suffix(GeneratorPackage::MANAGED_EXTENSION)?,
        GeneratorPackage::Native => {
            let stem = artifact.file_stem()?.to_str()?;
            stem.strip_prefix("lib").unwrap_or(stem)
        }
    };
    Some(artifact.with_file_name(format!("{}_profile.json", base)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_path_for_managed_artifact() {
        let path = profile_path(
            Path::new("/cg/modelfilter.unit.json"),
            GeneratorPackage::Managed,
        );
        assert_eq!(path, Some(PathBuf::from("/cg/modelfilter_profile.json")));
    }

    #[test]
    fn test_profile_path_for_native_artifact() {
        let path = profile_path(Path::new("/cg/libmodelfilter.so"), GeneratorPackage::Native);
        assert_eq!(path, Some(PathBuf::from("/cg/modelfilter_profile.json")));
    }
}
