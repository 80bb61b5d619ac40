//! File system utilities.

use crate::Result;
use std::path::{Path, PathBuf};

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(crate::Error::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Check whether a path is itself a symlink (without following it).
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Refuse a path that is a symlink.
pub fn reject_symlink(path: &Path) -> Result<()> {
    if is_symlink(path) {
        return Err(crate::Error::SymlinkedRoot(path.display().to_string()));
    }
    Ok(())
}

/// Return the path as a string with exactly one trailing slash.
///
/// rsync mirrors directory *contents* only when both paths end in a slash.
pub fn trailing_slash(path: &Path) -> String {
    let s = path.display().to_string();
    format!("{}/", s.trim_end_matches('/'))
}

/// Join a web root with a relative sub-path, tolerating leading slashes
/// in the sub-path (ini-style configs often carry them).
pub fn join_web_path(root: &Path, sub: &str) -> PathBuf {
    root.join(sub.trim_start_matches('/'))
}

/// Set a file read-only for the owner (0400 on unix).
///
/// Backup artifacts and undo files are locked after writing so a later
/// push cannot silently clobber them.
pub fn chmod_readonly(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o400);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Make a file writable by the owner again (0600 on unix).
pub fn chmod_writable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_readonly(false);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}
