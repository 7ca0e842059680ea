use std::fs;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

use crate::core::{DrError, Result};

/// Recursively copy `src` into `dst`, creating `dst`.
///
/// Symbolic links are followed, so the copy contains regular files only.
/// File permissions are preserved.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| DrError::fs("create directory", dst, &e))?;

    for entry in WalkDir::new(src).follow_links(true).min_depth(1) {
        let entry = entry.map_err(|e| DrError::FileSystem {
            operation: "read directory".to_string(),
            path: src.display().to_string(),
            reason: e.to_string(),
        })?;
        let relative = entry.path().strip_prefix(src).map_err(|e| DrError::FileSystem {
            operation: "copy directory".to_string(),
            path: entry.path().display().to_string(),
            reason: e.to_string(),
        })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| DrError::fs("create directory", &target, &e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| DrError::fs("copy file", entry.path(), &e))?;
        }
    }
    Ok(())
}

/// Remove a directory tree; a missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DrError::fs("remove directory", path, &e)),
    }
}

/// Write `content` to `path` readable by the owner only (mode 0600 on unix).
pub fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| DrError::fs("create private file", path, &e))?;
    file.write_all(content).map_err(|e| DrError::fs("write private file", path, &e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // mode() only applies when the file is created
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| DrError::fs("set permissions", path, &e))?;
    }
    Ok(())
}

/// Write through a temporary file in the same directory and rename it into
/// place, so readers never see a partial file.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut temp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| DrError::fs("create temporary file", dir, &e))?;
    temp.write_all(content).map_err(|e| DrError::fs("write temporary file", temp.path(), &e))?;
    temp.as_file().sync_all().map_err(|e| DrError::fs("sync file", temp.path(), &e))?;
    temp.persist(path).map_err(|e| DrError::fs("rename temporary file", path, &e.error))?;
    Ok(())
}
