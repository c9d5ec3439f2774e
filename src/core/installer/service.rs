use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument};

use crate::core::error::{BootstrapError, BootstrapResult};
use crate::core::paths::PRODUCT;

/// Readable only by members of the local administrators group.
const ADMIN_PROBE_KEY: &str = r"HKU\S-1-5-19";

/// Whether the current process can register system services.
/// An unavailable `reg` tool counts as unprivileged.
#[instrument]
pub fn has_admin_privileges() -> bool {
    match Command::new("reg").args(["query", ADMIN_PROBE_KEY]).output() {
        Ok(output) => output.status.success() && !output.stdout.is_empty(),
        Err(e) => {
            debug!("Privilege probe unavailable: {}", e);
            false
        }
    }
}

fn server_binary(install_dir: &Path) -> PathBuf {
    let name = if cfg!(windows) {
        format!("{PRODUCT}.bat")
    } else {
        PRODUCT.to_string()
    };
    install_dir.join("bin").join(name)
}

/// Run `bin/neo4j install` when privileged. Unprivileged hosts are a no-op.
pub async fn register_windows_service(install_dir: &Path) -> BootstrapResult<bool> {
    let install_dir = install_dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        if !has_admin_privileges() {
            debug!("Not running with admin privileges, skipping service registration");
            return Ok(false);
        }

        let binary = server_binary(&install_dir);
        let output = Command::new(&binary)
            .arg("install")
            .current_dir(&install_dir)
            .output()
            .map_err(|e| BootstrapError::ServiceRegistration(format!("{:?}: {}", binary, e)))?;

        if !output.status.success() {
            return Err(BootstrapError::ServiceRegistration(format!(
                "{:?} install exited with {}: {}",
                binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!("Neo4j installed as a service.");
        Ok(true)
    })
    .await?
}
