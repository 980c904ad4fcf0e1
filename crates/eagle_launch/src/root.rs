//! Project Root Resolution
//!
//! The launcher lives one directory below the project root
//! (`<root>/scripts/eagle_launch`, `<root>/bin/eagle_launch`, ...), so the root
//! is the parent of the directory that contains it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where the launcher believes it is running from.
pub fn launcher_location(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => std::env::current_exe().context("Failed to determine launcher location"),
    }
}

/// Resolve the project root from the launcher's location.
///
/// Relative locations are anchored at the current directory. Existing paths
/// are canonicalized so symlinked launchers resolve to the same root.
pub fn resolve_root(launcher: &Path) -> Result<PathBuf> {
    let absolute = absolutize(launcher)?;
    let launcher_dir = absolute
        .parent()
        .with_context(|| format!("Launcher path has no parent: {}", absolute.display()))?;
    let root = launcher_dir.parent().with_context(|| {
        format!(
            "Launcher directory has no parent: {}",
            launcher_dir.display()
        )
    })?;
    Ok(root.to_path_buf())
}

/// `--root` wins; otherwise derive it from the launcher location.
pub fn detect_root(root_override: Option<&Path>, launcher_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = root_override {
        return absolutize(root);
    }
    let launcher = launcher_location(launcher_path)?;
    resolve_root(&launcher)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize {}", path.display()));
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}
