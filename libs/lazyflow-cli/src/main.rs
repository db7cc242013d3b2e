// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! lazyflow CLI
//!
//! Inspect, check and clean compiled units outside a running model.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lazyflow::{GeneratorPackage, ProjectConfig};

mod commands;

#[derive(Parser)]
#[command(name = "lazyflow")]
#[command(author, version, about = "lazyflow artifact tooling", long_about = None)]
struct Cli {
    /// Directory containing lazyflow.yaml (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sanitized name and artifact file name for a host
    Name {
        /// Full hierarchical name, e.g. .model.filter
        #[arg(value_name = "FULL_NAME")]
        full_name: String,

        /// Generator package (native or managed)
        #[arg(long)]
        package: Option<GeneratorPackage>,

        /// Disambiguation counter appended to the name
        #[arg(long = "version", default_value_t = 0)]
        disambiguation: u64,
    },

    /// Open an artifact and show its ABI version, entry points and profile
    Inspect {
        #[arg(value_name = "ARTIFACT")]
        artifact: PathBuf,
    },

    /// Decide whether a host's artifact would be reused or rebuilt
    Check {
        /// Full hierarchical name of the host
        #[arg(long)]
        name: String,

        /// Model file the artifact was generated from
        #[arg(long, value_name = "MODEL_FILE")]
        model: PathBuf,

        /// Code directory (defaults to the configured one)
        #[arg(long = "code-dir", value_name = "DIR")]
        code_dir: Option<PathBuf>,

        /// Generator package (native or managed)
        #[arg(long)]
        package: Option<GeneratorPackage>,

        /// Treat the model as having unsaved modifications
        #[arg(long)]
        modified: bool,
    },

    /// Remove a host's artifacts and profile
    Clean {
        /// Full hierarchical name of the host
        #[arg(long)]
        name: String,

        /// Code directory (defaults to the configured one)
        #[arg(long = "code-dir", value_name = "DIR")]
        code_dir: Option<PathBuf>,
    },
}

fn load_config(dir: Option<&PathBuf>) -> Result<ProjectConfig> {
    match dir {
        Some(dir) => ProjectConfig::load(dir)
            .with_context(|| format!("Failed to load config from {}", dir.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Ok(ProjectConfig::load_or_default(&cwd))
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Name {
            full_name,
            package,
            disambiguation,
        } => commands::name::run(
            &full_name,
            package.unwrap_or(config.host.generator_package),
            disambiguation,
        ),
        Commands::Inspect { artifact } => commands::inspect::run(&artifact),
        Commands::Check {
            name,
            model,
            code_dir,
            package,
            modified,
        } => commands::check::run(&commands::check::CheckArgs {
            name: &name,
            model: &model,
            code_dir: &code_dir.unwrap_or(config.host.code_directory.clone()),
            package: package.unwrap_or(config.host.generator_package),
            modified,
        }),
        Commands::Clean { name, code_dir } => {
            commands::clean::run(&name, &code_dir.unwrap_or(config.host.code_directory))
        }
    }
}
