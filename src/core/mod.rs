// ─── neo4j-test-server core ───
// Fetches a Neo4j distribution, installs it under the package root and
// patches its config so a test suite can start a throwaway server.
//
// Architecture:
//   core/
//     settings/   : Package root, work dir, environment, dist host
//     paths/      : Archive names, download/install/config locations
//     platform/   : Windows vs Unix naming, extraction, service hook
//     downloader/ : Existence probe + streamed archive download
//     installer/  : Clear, extract, relocate, lock, service registration
//     config/     : Regex property patching of neo4j-server.properties
//     bootstrap/  : The single entry point sequencing the above

pub mod bootstrap;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod paths;
pub mod platform;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;
