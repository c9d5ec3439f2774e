use std::path::{Path, PathBuf};

use crate::core::error::BootstrapResult;
use crate::core::installer::{extract, service};

/// Host OS family. Picked once with [`Platform::current`] and passed down,
/// so archive naming, extraction and service registration agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        Self::for_windows(cfg!(windows))
    }

    pub fn for_windows(is_windows: bool) -> Self {
        if is_windows {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn is_windows(self) -> bool {
        self == Platform::Windows
    }

    /// Suffix of the cached archive file name.
    pub fn archive_suffix(self) -> &'static str {
        match self {
            Platform::Windows => "neo4j.zip",
            Platform::Unix => "neo4j-unix.tar.gz",
        }
    }

    /// Suffix of the distribution URL.
    pub fn url_suffix(self) -> &'static str {
        match self {
            Platform::Windows => "windows.zip",
            Platform::Unix => "unix.tar.gz",
        }
    }

    /// Unpack `archive` into `dest_dir` on a blocking worker.
    pub async fn extract(self, archive: &Path, dest_dir: &Path) -> BootstrapResult<()> {
        let archive: PathBuf = archive.to_path_buf();
        let dest_dir: PathBuf = dest_dir.to_path_buf();
        tokio::task::spawn_blocking(move || match self {
            Platform::Windows => extract::extract_zip_skip_existing(&archive, &dest_dir),
            Platform::Unix => extract::extract_tar_gz(&archive, &dest_dir),
        })
        .await?
    }

    /// Register the installed server as a system service where supported.
    /// Returns whether a registration happened.
    pub async fn install_as_service(self, install_dir: &Path) -> BootstrapResult<bool> {
        match self {
            Platform::Windows => service::register_windows_service(install_dir).await,
            Platform::Unix => Ok(false),
        }
    }
}
