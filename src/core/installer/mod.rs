pub mod extract;
pub mod lock;
pub mod service;

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::core::error::{BootstrapError, BootstrapResult};
use crate::core::paths::InstallPaths;

/// Turns a downloaded archive into a fresh install directory.
///
/// Every run clears the install directory first, unpacks into the work
/// directory, then moves `neo4j-<edition>` into place.
pub struct ArchiveInstaller {
    paths: InstallPaths,
}

impl ArchiveInstaller {
    pub fn new(paths: InstallPaths) -> Self {
        Self { paths }
    }

    #[instrument(skip(self, archive))]
    pub async fn install(&self, edition: &str, archive: &Path) -> BootstrapResult<PathBuf> {
        let install_path = self.paths.install_path()?;
        clear_install_location(&install_path).await?;

        let platform = self.paths.platform();
        let extract_start = Instant::now();
        platform.extract(archive, self.paths.work_dir()).await?;
        info!(
            "Extraction of {:?} finished in {:?}",
            archive,
            extract_start.elapsed()
        );

        let extracted = self.paths.extracted_dir(edition);
        if !extracted.is_dir() {
            return Err(BootstrapError::Extraction {
                archive: archive.to_path_buf(),
                reason: format!("archive did not contain {:?}", extracted),
            });
        }

        relocate(&extracted, &install_path).await?;
        info!("Neo4j installed in to {:?}", install_path);

        platform.install_as_service(&install_path).await?;
        Ok(install_path)
    }
}

async fn clear_install_location(install_path: &Path) -> BootstrapResult<()> {
    if install_path.exists() {
        debug!("Clearing previous install at {:?}", install_path);
        tokio::fs::remove_dir_all(install_path)
            .await
            .map_err(|source| BootstrapError::Io {
                path: install_path.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

/// Rename, falling back to copy-and-delete when the two paths sit on
/// different filesystems.
async fn relocate(source: &Path, destination: &Path) -> BootstrapResult<()> {
    match tokio::fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "Rename {:?} -> {:?} failed ({}), copying instead",
                source, destination, rename_err
            );
            let from = source.to_path_buf();
            let to = destination.to_path_buf();
            tokio::task::spawn_blocking(move || copy_server_tree(&from, &to)).await??;
            tokio::fs::remove_dir_all(source)
                .await
                .map_err(|source_err| BootstrapError::Io {
                    path: source.to_path_buf(),
                    source: source_err,
                })
        }
    }
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> BootstrapError + '_ {
    move |source| BootstrapError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Copy the server tree at `source` to `destination`. Symbolic links are
/// recreated as links where the platform allows it.
fn copy_server_tree(source: &Path, destination: &Path) -> BootstrapResult<()> {
    let mut pending = vec![(source.to_path_buf(), destination.to_path_buf())];

    while let Some((from_dir, to_dir)) = pending.pop() {
        std::fs::create_dir_all(&to_dir).map_err(io_at(&to_dir))?;

        for entry in std::fs::read_dir(&from_dir).map_err(io_at(&from_dir))? {
            let entry = entry.map_err(io_at(&from_dir))?;
            let from = entry.path();
            let to = to_dir.join(entry.file_name());
            let kind = entry.file_type().map_err(io_at(&from))?;

            if kind.is_symlink() {
                copy_link(&from, &to)?;
            } else if kind.is_dir() {
                pending.push((from, to));
            } else {
                std::fs::copy(&from, &to).map_err(io_at(&to))?;
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> BootstrapResult<()> {
    let target = std::fs::read_link(from).map_err(io_at(from))?;
    std::os::unix::fs::symlink(&target, to).map_err(io_at(to))
}

#[cfg(not(unix))]
fn copy_link(from: &Path, _to: &Path) -> BootstrapResult<()> {
    tracing::warn!("Skipping symbolic link {:?} while copying the server", from);
    Ok(())
}
