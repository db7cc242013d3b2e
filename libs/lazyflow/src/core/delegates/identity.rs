// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use url::Url;

/// Identity of the model a host belongs to, as tracked by an interactive
/// session. Absent when running headless.
pub trait ModelIdentity: Send + Sync {
    /// The model has unsaved modifications.
    fn is_modified(&self) -> bool;

    /// Where the model was loaded from, if anywhere.
    fn model_uri(&self) -> Option<Url>;
}

/// Identity backed by a model file on disk.
#[derive(Debug)]
pub struct FileModelIdentity {
    path: PathBuf,
    modified: AtomicBool,
}

impl FileModelIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            modified: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_modified(&self, modified: bool) {
        self.modified.store(modified, Ordering::SeqCst);
    }
}

impl ModelIdentity for FileModelIdentity {
    fn is_modified(&self) -> bool {
        self.modified.load(Ordering::SeqCst)
    }

    fn model_uri(&self) -> Option<Url> {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir().ok()?.join(&self.path)
        };
        Url::from_file_path(absolute).ok()
    }
}
