//! Fakes and fixture archives shared by the unit tests.

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::stream::{self, StreamExt};

use crate::core::downloader::{ArchiveSource, ChunkStream};
use crate::core::error::{BootstrapError, BootstrapResult};

/// In-memory `ArchiveSource` that records every call.
pub struct FakeSource {
    probe_status: u16,
    chunks: Vec<Vec<u8>>,
    fail_mid_stream: bool,
    probes: AtomicUsize,
    fetches: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn serving(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            probe_status: 200,
            chunks,
            fail_mid_stream: false,
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_probe_status(status: u16) -> Self {
        Self {
            probe_status: status,
            ..Self::serving(Vec::new())
        }
    }

    /// Serves `chunks`, then fails the stream.
    pub fn failing_after(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            fail_mid_stream: true,
            ..Self::serving(chunks)
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().expect("urls lock").clone()
    }
}

#[async_trait::async_trait]
impl ArchiveSource for FakeSource {
    async fn probe(&self, _url: &str) -> BootstrapResult<u16> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.probe_status)
    }

    async fn fetch(&self, url: &str) -> BootstrapResult<ChunkStream> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().expect("urls lock").push(url.to_string());

        let mut items: Vec<BootstrapResult<Vec<u8>>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if self.fail_mid_stream {
            items.push(Err(BootstrapError::Other("connection reset".into())));
        }
        Ok(stream::iter(items).boxed())
    }
}

pub const SAMPLE_PROPERTIES: &str = "\
org.neo4j.server.webserver.port = 7474
org.neo4j.server.webserver.https.enabled = true
dbms.security.auth_enabled = true
";

/// A `neo4j-<edition>.tar.gz` laid out like the upstream distribution.
pub fn tar_gz_distribution(edition: &str, properties: &str) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let root = format!("neo4j-{edition}");

    append_tar_file(
        &mut builder,
        &format!("{root}/conf/neo4j-server.properties"),
        properties.as_bytes(),
        0o644,
    );
    append_tar_file(
        &mut builder,
        &format!("{root}/bin/neo4j"),
        b"#!/bin/sh\n",
        0o755,
    );

    builder
        .into_inner()
        .expect("tar should finish")
        .finish()
        .expect("gzip should finish")
}

fn append_tar_file(
    builder: &mut tar::Builder<GzEncoder<Vec<u8>>>,
    path: &str,
    data: &[u8],
    mode: u32,
) {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    header.set_cksum();
    builder
        .append_data(&mut header, path, data)
        .expect("tar entry should be appended");
}

/// A `neo4j-<edition>.zip` laid out like the upstream distribution.
pub fn zip_distribution(edition: &str, properties: &str) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    let root = format!("neo4j-{edition}");

    zip.add_directory(format!("{root}/conf/"), options)
        .expect("directory entry should be added");
    zip.start_file(format!("{root}/conf/neo4j-server.properties"), options)
        .expect("file entry should start");
    zip.write_all(properties.as_bytes())
        .expect("zip entry should be written");
    zip.start_file(format!("{root}/bin/neo4j.bat"), options)
        .expect("file entry should start");
    zip.write_all(b"@echo off\r\n")
        .expect("zip entry should be written");

    zip.finish().expect("zip should finish").into_inner()
}
