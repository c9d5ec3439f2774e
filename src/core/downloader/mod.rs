pub mod client;

pub use client::{download_url, ArchiveSource, ChunkStream, Fetcher, HttpArchiveSource};
