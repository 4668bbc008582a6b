//! Test fixtures and environment helpers.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Returns `true` if a Docker daemon is reachable for integration tests.
#[must_use]
pub fn docker_available() -> bool {
    docker_available_with_host(std::env::var("DOCKER_HOST").ok())
}

fn docker_available_with_host(host: Option<String>) -> bool {
    if let Some(host) = host {
        if let Some(path) = host.strip_prefix("unix://") {
            return Path::new(path).exists();
        }
        return true;
    }

    Path::new("/var/run/docker.sock").exists()
        || Command::new("docker")
            .args(["info"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
}

/// Create a temporary directory with a recognisable prefix.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn temp_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("tapemig-")
        .tempdir()
        .context("failed to create temporary directory")
}

/// Create an empty file (and its parents) at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, b"").with_context(|| format!("failed to create {}", path.display()))
}

/// Write a `/bin/sh` script named `name` into `dir` and mark it executable.
///
/// # Errors
///
/// Returns an error if the script cannot be written or its mode changed.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    let mut permissions = fs::metadata(&path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions)?;
    Ok(path)
}
