use std::fs::{read_dir, remove_file, rename, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::task::spawn_blocking;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::PackError;

/// Packs every regular file directly inside `source_dir` into a store-only cbz at
/// `output_path`, returning the number of entries written.
///
/// The archive is assembled under a `.part` name next to `output_path` and only renamed onto
/// it once the zip is finished and synced, so `output_path` never holds a truncated archive.
pub async fn pack(source_dir: &Path, output_path: &Path) -> Result<usize, PackError> {
    let source_dir = source_dir.to_path_buf();
    let output_path = output_path.to_path_buf();

    spawn_blocking(move || write_archive(&source_dir, &output_path)).await?
}

/// `<output>.part`, the name an archive is built under.
pub fn part_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    output_path.with_file_name(name)
}

fn write_archive(source_dir: &Path, output_path: &Path) -> Result<usize, PackError> {
    let part = part_path(output_path);

    let written = write_part(source_dir, &part).and_then(|entries| {
        rename(&part, output_path)?;
        Ok(entries)
    });

    if written.is_err() {
        if let Err(error) = remove_file(&part) {
            if error.kind() != ErrorKind::NotFound {
                warn!("Failed to remove unfinished archive {}: {}", part.display(), error);
            }
        }
    }

    written
}

fn write_part(source_dir: &Path, part: &Path) -> Result<usize, PackError> {
    let mut entries = Vec::new();
    for entry in read_dir(source_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            entries.push(entry.path());
        }
    }
    entries.sort();

    debug!("Target file: {}", part.display());
    let file = File::create(part)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for path in &entries {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PackError::InvalidEntryName {
                path: path.display().to_string(),
            })?;

        debug!("Writing {} to cbz file", name);
        zip.start_file(name, options)?;
        let mut page = File::open(path)?;
        io::copy(&mut page, &mut zip)?;
    }

    let file = zip.finish()?;
    file.sync_all()?;

    Ok(entries.len())
}
