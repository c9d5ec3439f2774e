use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::core::config::{patch_auth_toggle, patch_server_config, AuthStatus};
use crate::core::downloader::{ArchiveSource, Fetcher, HttpArchiveSource};
use crate::core::error::{BootstrapError, BootstrapResult};
use crate::core::installer::lock::{acquire_install_lock, lock_path_for};
use crate::core::installer::ArchiveInstaller;
use crate::core::paths::InstallPaths;
use crate::core::platform::Platform;
use crate::core::settings::Settings;

/// Fetch → install → disable auth, for one edition at a time.
pub struct Bootstrapper {
    paths: InstallPaths,
    fetcher: Fetcher,
    installer: ArchiveInstaller,
}

impl Bootstrapper {
    pub fn new(settings: &Settings, platform: Platform, source: Arc<dyn ArchiveSource>) -> Self {
        let paths = InstallPaths::new(settings, platform);
        Self {
            fetcher: Fetcher::new(source, paths.clone(), settings.dist_host.clone()),
            installer: ArchiveInstaller::new(paths.clone()),
            paths,
        }
    }

    /// Host platform, archives over HTTP.
    pub fn from_settings(settings: &Settings) -> BootstrapResult<Self> {
        let source = Arc::new(HttpArchiveSource::new()?);
        Ok(Self::new(settings, Platform::current(), source))
    }

    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    /// Leaves a freshly extracted, auth-disabled server at the install path
    /// and returns that path.
    ///
    /// There is no rollback: a failed step leaves whatever it produced, and
    /// calling again is safe since the archive is cached and the install
    /// directory is always cleared first.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self, edition: &str) -> BootstrapResult<PathBuf> {
        if edition.is_empty() {
            return Err(BootstrapError::InvalidEdition);
        }

        let _lock = acquire_install_lock(&lock_path_for(&self.paths), edition).await?;

        let archive = self.fetcher.ensure_downloaded(edition).await?;
        let install_path = self.installer.install(edition, &archive).await?;
        patch_auth_toggle(&self.paths.config_file_path()?, AuthStatus::Disable).await?;

        info!("Neo4j {} ready at {:?}", edition, install_path);
        Ok(install_path)
    }

    /// Disable HTTPS and set the HTTP port of the installed server.
    pub async fn configure_server(&self, port: u16) -> BootstrapResult<()> {
        patch_server_config(&self.paths.config_file_path()?, port).await
    }

    pub async fn set_auth(&self, status: AuthStatus) -> BootstrapResult<()> {
        patch_auth_toggle(&self.paths.config_file_path()?, status).await
    }
}

/// Bootstrap `edition` with the default settings of this package.
pub async fn bootstrap(edition: &str) -> BootstrapResult<PathBuf> {
    if edition.is_empty() {
        return Err(BootstrapError::InvalidEdition);
    }
    let settings = Settings::load(&Settings::default().package_root);
    Bootstrapper::from_settings(&settings)?
        .bootstrap(edition)
        .await
}
