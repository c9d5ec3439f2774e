use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::error::{BootstrapError, BootstrapResult};
use crate::core::paths::InstallPaths;

/// A bootstrap holding the lock longer than this is assumed to be gone.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(60 * 10);
/// A lock whose owner record cannot be read is only trusted for this long,
/// the window between creating the file and writing the record.
const UNREADABLE_LOCK_GRACE: Duration = Duration::from_secs(30);
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// `tmp/db/neo4j/.<environment>.lock`
pub fn lock_path_for(paths: &InstallPaths) -> PathBuf {
    paths
        .install_root()
        .join(format!(".{}.lock", paths.environment()))
}

/// Record stored in the lock file: which process is installing what.
#[derive(Debug, Serialize, Deserialize)]
struct LockOwner {
    pid: u32,
    edition: String,
    acquired_at: DateTime<Utc>,
}

impl LockOwner {
    fn current(edition: &str) -> Self {
        Self {
            pid: std::process::id(),
            edition: edition.to_string(),
            acquired_at: Utc::now(),
        }
    }

    fn is_expired(&self) -> bool {
        let held = Utc::now().signed_duration_since(self.acquired_at);
        held.to_std().map_or(false, |held| held > LOCK_STALE_AFTER)
    }

    #[cfg(target_os = "linux")]
    fn is_orphaned(&self) -> bool {
        !Path::new(&format!("/proc/{}", self.pid)).exists()
    }

    #[cfg(not(target_os = "linux"))]
    fn is_orphaned(&self) -> bool {
        false
    }
}

/// Held for the lifetime of one bootstrap; removes the lock file on drop.
#[derive(Debug)]
pub struct InstallLockGuard {
    path: PathBuf,
}

impl Drop for InstallLockGuard {
    fn drop(&mut self) {
        if let Err(source) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock {:?}: {}", self.path, source);
        }
    }
}

/// Wait until this process owns the install lock at `lock_path`.
///
/// A lock is taken over when its owner is gone: the record is older than
/// ten minutes, names a dead process, or could not be read for longer than
/// it takes to write one.
pub async fn acquire_install_lock(
    lock_path: &Path,
    edition: &str,
) -> BootstrapResult<InstallLockGuard> {
    if let Some(parent) = lock_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| BootstrapError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let mut attempts = 0_u32;
    loop {
        attempts += 1;
        match tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(lock_path)
            .await
        {
            Ok(file) => {
                // Owned from here on, so a failed write below still releases it.
                let guard = InstallLockGuard {
                    path: lock_path.to_path_buf(),
                };
                write_owner(file, lock_path, edition).await?;
                debug!("Acquired install lock {:?} for {}", lock_path, edition);
                return Ok(guard);
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                let reclaimed = reclaim_if_abandoned(lock_path).await;
                if !reclaimed {
                    if attempts % 20 == 0 {
                        info!("Waiting for install lock at {:?}", lock_path);
                    }
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                }
            }
            Err(source) => {
                return Err(BootstrapError::Io {
                    path: lock_path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

/// Closes `file` before returning, so the guard can delete it on failure.
async fn write_owner(
    mut file: tokio::fs::File,
    lock_path: &Path,
    edition: &str,
) -> BootstrapResult<()> {
    let record = serde_json::to_vec(&LockOwner::current(edition))?;
    let io_err = |source| BootstrapError::Io {
        path: lock_path.to_path_buf(),
        source,
    };
    file.write_all(&record).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)
}

/// Remove the lock at `lock_path` if nobody can still be holding it.
async fn reclaim_if_abandoned(lock_path: &Path) -> bool {
    let owner = tokio::fs::read(lock_path)
        .await
        .ok()
        .and_then(|content| serde_json::from_slice::<LockOwner>(&content).ok());

    let abandoned = match &owner {
        Some(owner) => {
            debug!(
                "Install lock held by pid {} for {} since {}",
                owner.pid, owner.edition, owner.acquired_at
            );
            owner.is_expired() || owner.is_orphaned()
        }
        None => unreadable_for(lock_path).await > UNREADABLE_LOCK_GRACE,
    };
    if !abandoned {
        return false;
    }

    warn!("Reclaiming abandoned install lock {:?}", lock_path);
    match tokio::fs::remove_file(lock_path).await {
        Ok(()) => true,
        Err(err) => err.kind() == std::io::ErrorKind::NotFound,
    }
}

/// Time since the lock file was last written; zero when unknown.
async fn unreadable_for(lock_path: &Path) -> Duration {
    tokio::fs::metadata(lock_path)
        .await
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn backdate(path: &Path, by: Duration) {
        let file = std::fs::File::options()
            .write(true)
            .open(path)
            .expect("lock should open");
        file.set_modified(SystemTime::now() - by)
            .expect("mtime should be set");
    }

    #[tokio::test]
    async fn second_acquire_waits_for_release() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let lock_path = dir.path().join(".development.lock");

        let guard = acquire_install_lock(&lock_path, "3.0")
            .await
            .expect("first acquire should succeed");
        let record: LockOwner = serde_json::from_slice(
            &std::fs::read(&lock_path).expect("lock should be readable"),
        )
        .expect("lock should hold an owner record");
        assert_eq!(record.pid, std::process::id());
        assert_eq!(record.edition, "3.0");

        let blocked = tokio::time::timeout(
            Duration::from_millis(600),
            acquire_install_lock(&lock_path, "3.0"),
        )
        .await;
        assert!(blocked.is_err(), "lock should still be held");

        drop(guard);
        assert!(!lock_path.exists());

        let _again = acquire_install_lock(&lock_path, "3.0")
            .await
            .expect("acquire after release should succeed");
    }

    #[tokio::test]
    async fn expired_lock_is_reclaimed() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let lock_path = dir.path().join(".development.lock");
        let record = serde_json::json!({
            "pid": std::process::id(),
            "edition": "2.3",
            "acquired_at": "2000-01-01T00:00:00Z",
        });
        std::fs::write(&lock_path, record.to_string()).expect("lock should be written");

        let guard = tokio::time::timeout(
            Duration::from_secs(5),
            acquire_install_lock(&lock_path, "3.0"),
        )
        .await
        .expect("expired lock should not block")
        .expect("acquire should succeed");
        drop(guard);
    }

    #[tokio::test]
    async fn empty_lock_left_by_crash_is_reclaimed() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let lock_path = dir.path().join(".development.lock");
        std::fs::write(&lock_path, "").expect("lock should be written");
        backdate(&lock_path, Duration::from_secs(60));

        let guard = tokio::time::timeout(
            Duration::from_secs(3),
            acquire_install_lock(&lock_path, "3.0"),
        )
        .await
        .expect("empty lock should not block")
        .expect("acquire should succeed");
        drop(guard);
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn garbled_lock_is_reclaimed() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let lock_path = dir.path().join(".development.lock");
        std::fs::write(&lock_path, "{\"pid\": 12").expect("lock should be written");
        backdate(&lock_path, Duration::from_secs(60));

        let guard = tokio::time::timeout(
            Duration::from_secs(3),
            acquire_install_lock(&lock_path, "3.0"),
        )
        .await
        .expect("garbled lock should not block")
        .expect("acquire should succeed");
        drop(guard);
    }

    #[tokio::test]
    async fn fresh_empty_lock_is_still_respected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let lock_path = dir.path().join(".development.lock");
        std::fs::write(&lock_path, "").expect("lock should be written");

        let blocked = tokio::time::timeout(
            Duration::from_millis(600),
            acquire_install_lock(&lock_path, "3.0"),
        )
        .await;
        assert!(blocked.is_err(), "a lock being written should not be taken over");
        assert!(lock_path.exists());
    }
}
