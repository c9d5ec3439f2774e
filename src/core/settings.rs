use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_DIST_HOST: &str = "dist.neo4j.org";
const SETTINGS_FILE: &str = "test_server.json";

/// Fixed configuration for one bootstrapper.
///
/// `package_root` and `work_dir` are resolved at runtime; the remaining
/// fields may be overridden through `<package_root>/test_server.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where archives are cached and the `tmp/db` tree lives. Defaults to
    /// this crate's own root so every consuming project shares one cache.
    #[serde(skip)]
    pub package_root: PathBuf,
    /// Directory archives are unpacked into before being moved into place.
    #[serde(skip)]
    pub work_dir: PathBuf,
    pub environment: String,
    pub dist_host: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            package_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
            work_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            dist_host: DEFAULT_DIST_HOST.to_string(),
        }
    }
}

impl Settings {
    /// Defaults rooted at `package_root`, with overrides from the settings
    /// file when one exists there. A corrupt file is ignored.
    pub fn load(package_root: &Path) -> Self {
        let mut settings = load_settings_from_disk(package_root).unwrap_or_default();
        settings.package_root = package_root.to_path_buf();
        settings
    }

    pub fn with_package_root(mut self, package_root: impl Into<PathBuf>) -> Self {
        self.package_root = package_root.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_dist_host(mut self, dist_host: impl Into<String>) -> Self {
        self.dist_host = dist_host.into();
        self
    }
}

fn load_settings_from_disk(package_root: &Path) -> Option<Settings> {
    let path = package_root.join(SETTINGS_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<Settings>(&raw) {
        Ok(settings) => {
            debug!("Loaded settings from {:?}", path);
            Some(settings)
        }
        Err(e) => {
            warn!("Ignoring corrupt settings file {:?}: {}", path, e);
            None
        }
    }
}
