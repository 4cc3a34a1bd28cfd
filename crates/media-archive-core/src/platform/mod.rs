use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::WalkDir;

/// Filesystem operations the archive flows depend on.
pub trait ArchiveFs {
    /// All files under `root`, as paths relative to `root`, sorted.
    /// A missing root yields an empty list.
    fn list_files(&self, root: &Path) -> io::Result<Vec<PathBuf>>;

    /// Names of the immediate subdirectories of `root`.
    fn list_dirs(&self, root: &Path) -> io::Result<Vec<String>>;

    /// Move a file, creating the destination directory. Never overwrites.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Delete a file. A file that is already gone is not an error.
    fn delete_file(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl ArchiveFs for LocalFs {
    fn list_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err.io_error().map(|e| e.kind()) == Some(ErrorKind::PermissionDenied) {
                        error!("Access denied while walking {}: {}", root.display(), err);
                        continue;
                    }
                    return Err(io::Error::new(
                        ErrorKind::Other,
                        format!("Error walking {}: {}", root.display(), err),
                    ));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }
        files.sort();
        debug!("Listed {} files under {}", files.len(), root.display());
        Ok(files)
    }

    fn list_dirs(&self, root: &Path) -> io::Result<Vec<String>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(dirs)
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            return Err(io::Error::new(
                ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("{} already absent", path.display());
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Render a relative path with `/` separators, as stored in records.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_files_recursive_and_sorted() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("b.jpg"), "b").unwrap();
        fs::write(tmp.path().join("a.jpg"), "a").unwrap();
        fs::write(tmp.path().join("sub/c.png"), "c").unwrap();

        let files = LocalFs.list_files(tmp.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| to_slash_path(p)).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "sub/c.png"]);
    }

    #[test]
    fn test_list_files_missing_root_is_empty() {
        let tmp = tempdir().unwrap();
        assert!(LocalFs.list_files(&tmp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_move_refuses_overwrite() {
        let tmp = tempdir().unwrap();
        let from = tmp.path().join("a.jpg");
        let to = tmp.path().join("dest/a.jpg");
        fs::write(&from, "new").unwrap();
        fs::create_dir_all(tmp.path().join("dest")).unwrap();
        fs::write(&to, "old").unwrap();

        let err = LocalFs.move_file(&from, &to).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&to).unwrap(), "old");
        assert!(from.exists());
    }

    #[test]
    fn test_move_creates_parent_and_delete_tolerates_absent() {
        let tmp = tempdir().unwrap();
        let from = tmp.path().join("a.jpg");
        let to = tmp.path().join("2024-01-01/a.jpg");
        fs::write(&from, "x").unwrap();

        LocalFs.move_file(&from, &to).unwrap();
        assert!(to.exists());
        assert!(!from.exists());

        LocalFs.delete_file(&to).unwrap();
        LocalFs.delete_file(&to).unwrap();
        assert!(!LocalFs.exists(&to));
    }
}
