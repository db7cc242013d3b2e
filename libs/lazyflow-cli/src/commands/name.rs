// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use anyhow::Result;
use lazyflow::{sanitize_name, ArtifactName, GeneratorPackage};

/// Print the names a host's artifacts are written under.
pub fn run(full_name: &str, package: GeneratorPackage, disambiguation: u64) -> Result<()> {
    let artifact = ArtifactName::new(full_name, disambiguation, package)?;

    println!("{}", full_name);
    println!("  Sanitized: {}", sanitize_name(full_name));
    println!("  Package:   {}", package);
    println!("  Artifact:  {}", artifact.file_name());
    println!("  Profile:   {}", artifact.profile_file_name());

    Ok(())
}
