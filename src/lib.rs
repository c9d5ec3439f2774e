pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::bootstrap::{bootstrap, Bootstrapper};
pub use crate::core::config::AuthStatus;
pub use crate::core::error::{BootstrapError, BootstrapResult};
pub use crate::core::paths::{archive_file_name, InstallPaths};
pub use crate::core::platform::Platform;
pub use crate::core::settings::Settings;

/// Install a `tracing` subscriber honouring `RUST_LOG`. Safe to call more
/// than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,neo4j_test_server=debug")),
        )
        .try_init();
}
