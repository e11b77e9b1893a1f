//! Packaging the store directory into a zip file.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::{DeployError, DeployResult};

/// Zips every file under `src_dir` into `dest_file`.
///
/// Entry names are relative to `src_dir` (no enclosing directory) and use
/// `/` separators. Entries are sorted by name. If `dest_file` lives inside
/// `src_dir` it is not added to itself. Resolves once the archive has been
/// finalized; on failure a partial file may remain at `dest_file`.
///
/// Returns the number of files added.
pub async fn zip_directory(src_dir: &Path, dest_file: &Path) -> DeployResult<usize> {
    let src = src_dir.to_path_buf();
    let dest = dest_file.to_path_buf();

    tokio::task::spawn_blocking(move || {
        write_archive(&src, &dest).map_err(|e| DeployError::Archive {
            path: src.clone(),
            message: e.to_string(),
        })
    })
    .await
    .map_err(|e| DeployError::Archive {
        path: src_dir.to_path_buf(),
        message: format!("archive task failed: {}", e),
    })?
}

fn write_archive(src_dir: &Path, dest_file: &Path) -> zip::result::ZipResult<usize> {
    let mut files = Vec::new();
    collect_files(src_dir, &mut files)?;
    files.sort();

    let file = File::create(dest_file)?;
    let dest = fs::canonicalize(dest_file)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    for path in files {
        if fs::canonicalize(&path)? == dest {
            continue;
        }
        let name = entry_name(src_dir, &path)?;
        debug!("adding {}", name);

        writer.start_file(name, options)?;
        let mut input = File::open(&path)?;
        io::copy(&mut input, &mut writer)?;
        count += 1;
    }

    writer.finish()?;
    Ok(count)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn entry_name(root: &Path, path: &Path) -> io::Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
