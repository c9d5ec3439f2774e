use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::core::error::{BootstrapError, BootstrapResult};
use crate::core::http::build_http_client;
use crate::core::paths::{InstallPaths, PRODUCT};
use crate::core::platform::Platform;

/// Body of a download, chunk by chunk.
pub type ChunkStream = BoxStream<'static, BootstrapResult<Vec<u8>>>;

/// Where distribution archives come from.
#[async_trait::async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Status code of an existence probe against `url`.
    async fn probe(&self, url: &str) -> BootstrapResult<u16>;

    /// Open the payload at `url` as a stream of chunks.
    async fn fetch(&self, url: &str) -> BootstrapResult<ChunkStream>;
}

/// `ArchiveSource` over plain HTTP.
pub struct HttpArchiveSource {
    client: Client,
}

impl HttpArchiveSource {
    pub fn new() -> BootstrapResult<Self> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ArchiveSource for HttpArchiveSource {
    async fn probe(&self, url: &str) -> BootstrapResult<u16> {
        let response = self.client.head(url).send().await?;
        Ok(response.status().as_u16())
    }

    async fn fetch(&self, url: &str) -> BootstrapResult<ChunkStream> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(BootstrapError::from))
            .boxed())
    }
}

/// `http://<host>/neo4j-<edition>-<windows.zip|unix.tar.gz>`
pub fn download_url(dist_host: &str, edition: &str, platform_is_windows: bool) -> String {
    let suffix = Platform::for_windows(platform_is_windows).url_suffix();
    format!("http://{dist_host}/{PRODUCT}-{edition}-{suffix}")
}

/// Fetches distribution archives into the shared download cache.
pub struct Fetcher {
    source: Arc<dyn ArchiveSource>,
    paths: InstallPaths,
    dist_host: String,
}

impl Fetcher {
    pub fn new(source: Arc<dyn ArchiveSource>, paths: InstallPaths, dist_host: String) -> Self {
        Self {
            source,
            paths,
            dist_host,
        }
    }

    pub fn download_url(&self, edition: &str) -> String {
        download_url(&self.dist_host, edition, self.paths.platform().is_windows())
    }

    /// Download unless an archive is already cached. Existence is the only
    /// validity check.
    pub async fn ensure_downloaded(&self, edition: &str) -> BootstrapResult<PathBuf> {
        let dest = self.paths.download_path(edition);
        if dest.exists() {
            debug!("Using cached archive {:?}", dest);
            return Ok(dest);
        }
        self.download(edition).await
    }

    /// Probe the URL, then stream the archive to the download path.
    ///
    /// A failed write removes whatever was written at the download path
    /// before the error is returned.
    #[instrument(skip(self))]
    pub async fn download(&self, edition: &str) -> BootstrapResult<PathBuf> {
        let url = self.download_url(edition);
        let dest = self.paths.download_path(edition);

        let status = self.source.probe(&url).await?;
        if !(200..300).contains(&status) {
            return Err(BootstrapError::DownloadUnavailable {
                edition: edition.to_string(),
                url,
                status,
            });
        }

        info!("Downloading {} -> {:?}", url, dest);
        match self.write_payload(&url, &dest).await {
            Ok(bytes) => {
                info!("Downloaded {} bytes for {}", bytes, edition);
                Ok(dest)
            }
            Err(err) => {
                remove_partial(&dest).await;
                Err(err)
            }
        }
    }

    async fn write_payload(&self, url: &str, dest: &Path) -> BootstrapResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| BootstrapError::DownloadWrite {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut stream = self.source.fetch(url).await?;

        // The handle is dropped on return, before the caller cleans up.
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| BootstrapError::DownloadWrite {
                path: dest.to_path_buf(),
                source,
            })?;
        let mut written = 0_u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|source| BootstrapError::DownloadWrite {
                    path: dest.to_path_buf(),
                    source,
                })?;
            written = written.saturating_add(chunk.len() as u64);
        }
        file.flush()
            .await
            .map_err(|source| BootstrapError::DownloadWrite {
                path: dest.to_path_buf(),
                source,
            })?;

        Ok(written)
    }
}

async fn remove_partial(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => debug!("Removed partial download {:?}", dest),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {:?}: {}", dest, e),
    }
}
