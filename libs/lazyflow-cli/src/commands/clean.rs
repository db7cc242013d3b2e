// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;

use anyhow::{Context, Result};
use lazyflow::{ArtifactName, GeneratorPackage};

/// Delete every artifact and profile generated for `name`.
pub fn run(name: &str, code_dir: &Path) -> Result<()> {
    let mut removed = 0;
    for package in [GeneratorPackage::Native, GeneratorPackage::Managed] {
        let artifact = ArtifactName::new(name, 0, package)?;
        for path in [
            artifact.path_in(code_dir),
            artifact.profile_path_in(code_dir),
        ] {
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                println!("removed {}", path.display());
                removed += 1;
            }
        }
    }

    if removed == 0 {
        println!("Nothing to clean for '{}' in {}", name, code_dir.display());
    }
    Ok(())
}
