use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::core::error::{BootstrapError, BootstrapResult};

fn extraction_error(archive: &Path, reason: impl ToString) -> BootstrapError {
    BootstrapError::Extraction {
        archive: archive.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Unpack a zip into `dest_dir` entry by entry.
///
/// Entries whose target already exists are skipped, not overwritten. A
/// failing entry is logged and the rest of the archive is still unpacked;
/// only an unreadable archive aborts.
pub fn extract_zip_skip_existing(archive_path: &Path, dest_dir: &Path) -> BootstrapResult<()> {
    let zip_file = File::open(archive_path).map_err(|e| extraction_error(archive_path, e))?;
    let mut archive =
        zip::ZipArchive::new(zip_file).map_err(|e| extraction_error(archive_path, e))?;

    std::fs::create_dir_all(dest_dir).map_err(|source| BootstrapError::Io {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let mut skipped = 0_usize;
    for index in 0..archive.len() {
        let mut zipped = match archive.by_index(index) {
            Ok(zipped) => zipped,
            Err(e) => {
                warn!("Entry #{} failed to extract: {}", index, e);
                continue;
            }
        };

        let Some(rel_path) = zipped.enclosed_name() else {
            warn!("{} failed to extract: unsafe path", zipped.name());
            continue;
        };
        let out_path = dest_dir.join(rel_path);

        if zipped.is_dir() {
            if let Err(e) = std::fs::create_dir_all(&out_path) {
                warn!("{} failed to extract: {}", zipped.name(), e);
            }
            continue;
        }

        if out_path.exists() {
            skipped += 1;
            continue;
        }

        let mode = zipped.unix_mode();
        if let Err(e) = write_entry(&mut zipped, &out_path, mode) {
            warn!("{} failed to extract: {}", zipped.name(), e);
        }
    }

    debug!(
        "Extracted {:?} into {:?} ({} existing entries skipped)",
        archive_path, dest_dir, skipped
    );
    Ok(())
}

fn write_entry<R: Read>(
    entry: &mut R,
    out_path: &Path,
    unix_mode: Option<u32>,
) -> std::io::Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = File::create(out_path)?;
    std::io::copy(entry, &mut out)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = unix_mode {
            std::fs::set_permissions(out_path, std::fs::Permissions::from_mode(mode))?;
        }
    }
    #[cfg(not(unix))]
    let _ = unix_mode;

    Ok(())
}

/// Unpack a tar.gz into `dest_dir` in one pass. Any failure aborts.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> BootstrapResult<()> {
    let file = File::open(archive_path).map_err(|e| extraction_error(archive_path, e))?;

    std::fs::create_dir_all(dest_dir).map_err(|source| BootstrapError::Io {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest_dir)
        .map_err(|e| extraction_error(archive_path, e))?;

    debug!("Extracted {:?} into {:?}", archive_path, dest_dir);
    Ok(())
}
