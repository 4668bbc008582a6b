//! Path deletion for working directories, tape images and ready markers.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tapemig_core::{CoreError, CoreResult};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::debug;

const WAIT_POLL: Duration = Duration::from_millis(50);
const WAIT_LIMIT: Duration = Duration::from_secs(30);

/// Remove `path`, recursively for directories.
///
/// A missing path is a no-op. With `wait` the call only returns once the path
/// is gone from the filesystem.
///
/// # Errors
///
/// Returns an error when the removal fails or, with `wait`, when the path is
/// still present after the wait limit.
pub async fn delete_path(path: &Path, wait: bool) -> CoreResult<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "nothing to delete");
            return Ok(());
        }
        Err(err) => return Err(CoreError::io("cleanup.stat", path, err)),
    };

    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match removed {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(CoreError::io("cleanup.remove", path, err)),
    }

    if wait {
        let started = Instant::now();
        while tokio::fs::try_exists(path).await.unwrap_or(false) {
            if started.elapsed() >= WAIT_LIMIT {
                return Err(CoreError::Precondition {
                    reason: "path_still_present",
                    path: path.to_path_buf(),
                });
            }
            sleep(WAIT_POLL).await;
        }
    }
    debug!(path = %path.display(), "path deleted");
    Ok(())
}

/// Start a non-blocking deletion of `path`.
#[must_use]
pub fn spawn_delete(path: PathBuf) -> JoinHandle<CoreResult<()>> {
    tokio::spawn(async move { delete_path(&path, false).await })
}
