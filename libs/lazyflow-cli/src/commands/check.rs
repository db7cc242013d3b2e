// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;

use anyhow::Result;
use lazyflow::core::staleness::StalenessInputs;
use lazyflow::{ArtifactName, FileModelIdentity, GeneratorPackage, StalenessOracle};

pub struct CheckArgs<'a> {
    pub name: &'a str,
    pub model: &'a Path,
    pub code_dir: &'a Path,
    pub package: GeneratorPackage,
    pub modified: bool,
}

/// Run the staleness oracle the way a host would at initialize.
pub fn run(args: &CheckArgs<'_>) -> Result<()> {
    let artifact = ArtifactName::new(args.name, 0, args.package)?.path_in(args.code_dir);
    let identity = FileModelIdentity::new(args.model);
    identity.set_modified(args.modified);

    let mut oracle = StalenessOracle::new();
    let verdict = oracle.evaluate(&StalenessInputs {
        identity: Some(&identity),
        model_uri: None,
        artifact: &artifact,
    });

    println!("{}", artifact.display());
    match verdict.reason {
        Some(reason) => println!("  rebuild: {}", reason),
        None => println!("  reuse"),
    }

    Ok(())
}
