//! Zip packaging of a downloaded log tree

use crate::error::CollectorError;
use log::{debug, info};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Compress `source_dir` into `<archive_base>.zip`
///
/// Entry names start with the source directory's own name, so unpacking the
/// archive next to it reproduces `source_dir` exactly.
///
/// # Errors
///
/// Returns `CollectorError::IoError` if the tree cannot be read or the archive
/// cannot be written, and `CollectorError::Archive` for zip encoding errors.
pub fn archive(source_dir: &Path, archive_base: &Path) -> Result<PathBuf, CollectorError> {
    let mut archive_path = archive_base.as_os_str().to_owned();
    archive_path.push(".zip");
    let archive_path = PathBuf::from(archive_path);

    info!("Creating a zip archive of {}", source_dir.display());

    let root = source_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(File::create(&archive_path)?);
    add_tree(&mut zip, source_dir, &root, options)?;
    zip.finish()?;

    info!("Zip archive created successfully at: {}", archive_path.display());
    Ok(archive_path)
}

fn add_tree<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    dir: &Path,
    prefix: &str,
    options: SimpleFileOptions,
) -> Result<(), CollectorError> {
    if !prefix.is_empty() {
        zip.add_directory(format!("{}/", prefix), options)?;
    }

    let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let entry_name = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        if entry.file_type()?.is_dir() {
            add_tree(zip, &entry.path(), &entry_name, options)?;
        } else {
            debug!("Adding {}", entry_name);
            zip.start_file(entry_name, options)?;
            let mut file = File::open(entry.path())?;
            std::io::copy(&mut file, zip)?;
        }
    }

    Ok(())
}
