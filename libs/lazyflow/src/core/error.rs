// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure to turn an artifact on disk into a callable unit.
///
/// Every variant except [`BindError::IncompatibleVersion`] and
/// [`BindError::IncompatibleFormat`] is usually cured by regenerating.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("compiled unit not found at {}: {hint}", .path.display())]
    ArtifactNotFound { path: PathBuf, hint: String },

    #[error("compiled unit {} has an incompatible binary format: {reason}", .path.display())]
    IncompatibleFormat { path: PathBuf, reason: String },

    #[error(
        "compiled unit {} was built against unit ABI v{found}, this runtime expects v{expected}; \
         it was probably generated on another machine or by another release",
        .path.display()
    )]
    IncompatibleVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("compiled unit {} does not export required entry point '{entry_point}'", .path.display())]
    MissingEntryPoint { path: PathBuf, entry_point: String },

    #[error("failed to load compiled unit {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to instantiate compiled unit {}: {reason}", .path.display())]
    Instantiate { path: PathBuf, reason: String },
}

impl BindError {
    /// Hint attached to [`BindError::ArtifactNotFound`].
    pub const CLEANED_HINT: &'static str =
        "the code directory may have been cleaned; the unit will be regenerated";

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        BindError::ArtifactNotFound {
            path: path.into(),
            hint: Self::CLEANED_HINT.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            BindError::ArtifactNotFound { path, .. }
            | BindError::IncompatibleFormat { path, .. }
            | BindError::IncompatibleVersion { path, .. }
            | BindError::MissingEntryPoint { path, .. }
            | BindError::Load { path, .. }
            | BindError::Instantiate { path, .. } => path,
        }
    }
}

/// The external code generator failed. The cause is kept for diagnostics.
#[derive(Error, Debug)]
#[error("code generation failed for '{unit}'")]
pub struct GenerationError {
    pub unit: String,
    #[source]
    pub source: anyhow::Error,
}

impl GenerationError {
    pub fn new(unit: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            unit: unit.into(),
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("port '{port}' should consume {rate} token(s) on channel {channel}, but fewer are available")]
    InsufficientTokens {
        port: String,
        channel: usize,
        rate: usize,
    },

    #[error("port '{port}' has type {port_type}, which cannot cross the compiled boundary")]
    UnsupportedPortType { port: String, port_type: String },

    #[error("channel '{channel}' already has a publisher in scope '{scope}'")]
    DuplicateChannel { channel: String, scope: String },

    #[error("port '{port}' expected a {expected} token, received {found}")]
    TokenTypeMismatch {
        port: String,
        expected: String,
        found: String,
    },

    #[error("port '{port}' produced {found} value(s), expected {expected}")]
    OutputShape {
        port: String,
        expected: usize,
        found: usize,
    },

    #[error("array element '{value}' on port '{port}' cannot be converted to {target}")]
    ArrayElementConversion {
        port: String,
        value: String,
        target: String,
    },

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("compiled unit '{unit}' failed in {entry_point}: {reason}")]
    UnitInvocation {
        unit: String,
        entry_point: String,
        reason: String,
    },

    #[error("Subgraph error: {0}")]
    Graph(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
