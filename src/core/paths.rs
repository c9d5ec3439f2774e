use std::path::{Path, PathBuf};

use crate::core::error::{BootstrapError, BootstrapResult};
use crate::core::platform::Platform;
use crate::core::settings::Settings;

pub const PRODUCT: &str = "neo4j";

/// `"<edition>-<suffix>"`, or the bare suffix when `edition` is empty.
pub fn archive_file_name(edition: &str, platform_is_windows: bool) -> String {
    let suffix = Platform::for_windows(platform_is_windows).archive_suffix();
    if edition.is_empty() {
        suffix.to_string()
    } else {
        format!("{edition}-{suffix}")
    }
}

/// Canonical on-disk locations for one bootstrapper.
#[derive(Debug, Clone)]
pub struct InstallPaths {
    package_root: PathBuf,
    work_dir: PathBuf,
    environment: String,
    platform: Platform,
}

impl InstallPaths {
    pub fn new(settings: &Settings, platform: Platform) -> Self {
        Self {
            package_root: settings.package_root.clone(),
            work_dir: settings.work_dir.clone(),
            environment: settings.environment.clone(),
            platform,
        }
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn download_path(&self, edition: &str) -> PathBuf {
        self.package_root
            .join(archive_file_name(edition, self.platform.is_windows()))
    }

    /// `tmp/db/neo4j` under the package root. Holds one directory per
    /// environment.
    pub fn install_root(&self) -> PathBuf {
        self.package_root.join("tmp").join("db").join(PRODUCT)
    }

    /// `tmp/db/neo4j/<environment>`; the install root is created if absent,
    /// the environment directory itself is left to the installer.
    pub fn install_path(&self) -> BootstrapResult<PathBuf> {
        let root = self.install_root();
        std::fs::create_dir_all(&root).map_err(|source| BootstrapError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(root.join(&self.environment))
    }

    pub fn config_file_path(&self) -> BootstrapResult<PathBuf> {
        Ok(self
            .install_path()?
            .join("conf")
            .join(format!("{PRODUCT}-server.properties")))
    }

    /// Top-level directory an archive for `edition` unpacks to.
    pub fn extracted_dir(&self, edition: &str) -> PathBuf {
        self.work_dir.join(format!("{PRODUCT}-{edition}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_in(root: &Path, platform: Platform) -> InstallPaths {
        let settings = Settings::default()
            .with_package_root(root)
            .with_work_dir(root.join("work"));
        InstallPaths::new(&settings, platform)
    }

    #[test]
    fn archive_file_names() {
        assert_eq!(archive_file_name("3.0", true), "3.0-neo4j.zip");
        assert_eq!(archive_file_name("3.0", false), "3.0-neo4j-unix.tar.gz");
        assert_eq!(archive_file_name("", false), "neo4j-unix.tar.gz");
        assert_eq!(archive_file_name("", true), "neo4j.zip");
    }

    #[test]
    fn download_path_is_under_package_root() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let paths = paths_in(dir.path(), Platform::Unix);
        assert_eq!(paths.package_root(), dir.path());
        assert_eq!(
            paths.download_path("2.2.9"),
            paths.package_root().join("2.2.9-neo4j-unix.tar.gz")
        );
    }

    #[test]
    fn install_path_creates_root_only() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let paths = paths_in(dir.path(), Platform::Unix);

        let install = paths.install_path().expect("install path should resolve");
        assert_eq!(
            install,
            dir.path().join("tmp/db/neo4j").join(paths.environment())
        );
        assert!(dir.path().join("tmp/db/neo4j").is_dir());
        assert!(!install.exists());
    }

    #[test]
    fn config_file_lives_in_conf() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let paths = paths_in(dir.path(), Platform::Windows);
        let config = paths.config_file_path().expect("config path should resolve");
        assert!(config.ends_with("development/conf/neo4j-server.properties"));
    }

    #[test]
    fn extracted_dir_is_in_work_dir() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let paths = paths_in(dir.path(), Platform::Unix);
        assert_eq!(
            paths.extracted_dir("3.0.1"),
            dir.path().join("work").join("neo4j-3.0.1")
        );
    }
}
