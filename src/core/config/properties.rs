use std::path::Path;

use regex::{NoExpand, Regex};
use tracing::{debug, warn};

use crate::core::error::{BootstrapError, BootstrapResult};

/// Auth flag names, one per supported server generation.
pub const AUTH_KEYS: [&str; 2] = [
    "dbms.security.authorization_enabled",
    "dbms.security.auth_enabled",
];
pub const HTTPS_ENABLED_KEY: &str = "org.neo4j.server.webserver.https.enabled";
pub const HTTP_PORT_KEY: &str = "org.neo4j.server.webserver.port";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Enable,
    Disable,
}

impl AuthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthStatus::Enable => "true",
            AuthStatus::Disable => "false",
        }
    }
}

/// Rewrite every `key = <word>` in `source` to `key=value`.
///
/// Keys are matched literally. Text without the key comes back unchanged;
/// nothing is ever appended.
pub fn set_property(source: &str, key: &str, value: &str) -> String {
    let pattern = format!(r"{}\s*=\s*\w+", regex::escape(key));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!("Unusable property pattern for {}: {}", key, e);
            return source.to_string();
        }
    };
    let replacement = format!("{key}={value}");
    re.replace_all(source, NoExpand(&replacement)).into_owned()
}

pub fn toggle_auth(status: AuthStatus, source: &str) -> String {
    AUTH_KEYS
        .iter()
        .fold(source.to_string(), |text, key| {
            set_property(&text, key, status.as_str())
        })
}

/// Disable HTTPS and pin the HTTP port.
pub fn apply_server_config(source: &str, port: u16) -> String {
    let text = set_property(source, HTTPS_ENABLED_KEY, "false");
    set_property(&text, HTTP_PORT_KEY, &port.to_string())
}

pub async fn patch_auth_toggle(config_path: &Path, status: AuthStatus) -> BootstrapResult<()> {
    rewrite_config(config_path, |text| toggle_auth(status, text)).await?;
    debug!("Auth set to {} in {:?}", status.as_str(), config_path);
    Ok(())
}

pub async fn patch_server_config(config_path: &Path, port: u16) -> BootstrapResult<()> {
    rewrite_config(config_path, |text| apply_server_config(text, port)).await?;
    debug!("HTTP port set to {} in {:?}", port, config_path);
    Ok(())
}

/// Read, transform, and write back with a trailing newline.
async fn rewrite_config<F>(config_path: &Path, transform: F) -> BootstrapResult<()>
where
    F: FnOnce(&str) -> String,
{
    let text = tokio::fs::read_to_string(config_path)
        .await
        .map_err(|source| BootstrapError::Config {
            path: config_path.to_path_buf(),
            source,
        })?;

    let mut patched = transform(&text);
    if !patched.ends_with('\n') {
        patched.push('\n');
    }

    tokio::fs::write(config_path, patched)
        .await
        .map_err(|source| BootstrapError::Config {
            path: config_path.to_path_buf(),
            source,
        })
}
