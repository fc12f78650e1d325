use std::{fs, path::Path};

use anyhow::{Context as _, Result};
use log::info;

pub fn create_dir(path: &Path) -> Result<()> {
    info!("create directory {}", path.display());

    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory {}", path.display()))
}

/// Copies contents and permissions of `src` to `dest`.
pub fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    info!("copy file {} to {}", src.display(), dest.display());

    fs::copy(src, dest)
        .with_context(|| format!("failed to copy file {} to {}", src.display(), dest.display()))?;

    Ok(())
}

/// Copies the regular files found directly in `src_dir`. Sub-directories are skipped.
pub fn copy_files(src_dir: &Path, dest_dir: &Path) -> Result<()> {
    let entries = fs::read_dir(src_dir)
        .with_context(|| format!("failed to read directory {}", src_dir.display()))?;

    for entry in entries {
        let entry = entry?;

        if entry.file_type()?.is_dir() {
            continue;
        }

        copy_file(&entry.path(), &dest_dir.join(entry.file_name()))?;
    }

    Ok(())
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Writes `contents`, creating the parent directory first.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }

    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
