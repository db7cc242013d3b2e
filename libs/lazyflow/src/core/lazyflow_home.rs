// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::PathBuf;

/// Get the LAZYFLOW_HOME directory path.
///
/// Resolution order:
/// 1. `LAZYFLOW_HOME` environment variable (explicit override)
/// 2. `XDG_CONFIG_HOME/lazyflow` (XDG compliance)
/// 3. `~/.lazyflow` (default)
///
/// The directory structure under LAZYFLOW_HOME:
/// ```text
/// ~/.lazyflow/
/// └── cg/                       # Default code directory
///     ├── libmodeltop.so        # Native unit (platform-specific name)
///     ├── modeltop.unit.json    # Managed unit manifest
///     └── modeltop_profile.json # Boundary profile of the unit
/// ```
pub fn get_lazyflow_home() -> PathBuf {
    if let Ok(home) = std::env::var("LAZYFLOW_HOME") {
        return PathBuf::from(home);
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("lazyflow");
    }

    match dirs::home_dir() {
        Some(home) => home.join(".lazyflow"),
        None => {
            tracing::warn!("Could not determine home directory, using the temp directory");
            std::env::temp_dir().join(".lazyflow")
        }
    }
}

/// Default directory generated units are written to and loaded from.
pub fn default_code_directory() -> PathBuf {
    get_lazyflow_home().join("cg")
}

/// Ensure LAZYFLOW_HOME and the default code directory exist.
pub fn ensure_lazyflow_home() -> std::io::Result<PathBuf> {
    let home = get_lazyflow_home();
    std::fs::create_dir_all(home.join("cg"))?;
    Ok(home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_env_override_wins() {
        let dir = TempDir::new().unwrap();
        unsafe { std::env::set_var("LAZYFLOW_HOME", dir.path()) };

        assert_eq!(get_lazyflow_home(), dir.path());
        assert_eq!(default_code_directory(), dir.path().join("cg"));

        unsafe { std::env::remove_var("LAZYFLOW_HOME") };
    }

    #[test]
    #[serial]
    fn test_ensure_creates_code_directory() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("nested");
        unsafe { std::env::set_var("LAZYFLOW_HOME", &home) };

        let created = ensure_lazyflow_home().unwrap();
        assert_eq!(created, home);
        assert!(home.join("cg").is_dir());

        unsafe { std::env::remove_var("LAZYFLOW_HOME") };
    }
}
