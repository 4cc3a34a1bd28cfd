use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::platform::{to_slash_path, ArchiveFs};
use crate::rules::ExtensionFilter;

/// A file found under a scan root, split into base name and extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StagedFile {
    /// Path relative to the scan root.
    pub relative: PathBuf,
    pub base_name: String,
    pub extension: Option<String>,
}

impl StagedFile {
    pub fn from_relative(relative: &Path) -> Option<Self> {
        let file_name = relative.file_name()?.to_str()?;
        let (base_name, extension) = split_name(file_name);
        Some(Self {
            relative: relative.to_path_buf(),
            base_name,
            extension,
        })
    }

    pub fn file_name(&self) -> String {
        full_name(&self.base_name, self.extension.as_deref())
    }

    /// Relative path with `/` separators.
    pub fn display_path(&self) -> String {
        to_slash_path(&self.relative)
    }

    /// Relative path of a sibling named `new_base` with this file's extension.
    pub fn sibling_path(&self, new_base: &str) -> String {
        let name = full_name(new_base, self.extension.as_deref());
        match self.relative.parent().map(to_slash_path) {
            Some(parent) if !parent.is_empty() => format!("{}/{}", parent, name),
            _ => name,
        }
    }
}

/// Split `name.ext` at the last dot. Dot-files have no extension.
pub fn split_name(file_name: &str) -> (String, Option<String>) {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => (
            file_name[..pos].to_string(),
            Some(file_name[pos + 1..].to_string()),
        ),
        _ => (file_name.to_string(), None),
    }
}

pub fn full_name(base_name: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{}.{}", base_name, ext),
        None => base_name.to_string(),
    }
}

/// List files under `root` whose extension passes `filter`, sorted by path.
pub fn scan_files<F: ArchiveFs>(
    fs: &F,
    root: &Path,
    filter: &ExtensionFilter,
) -> io::Result<Vec<StagedFile>> {
    let mut staged = Vec::new();
    for relative in fs.list_files(root)? {
        match StagedFile::from_relative(&relative) {
            Some(file) if filter.allows(file.extension.as_deref()) => staged.push(file),
            Some(_) => {}
            None => warn!("Skipping non UTF-8 file name: {}", relative.display()),
        }
    }
    staged.sort();
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("a.b.jpg"), ("a.b".to_string(), Some("jpg".to_string())));
        assert_eq!(split_name("noext"), ("noext".to_string(), None));
        assert_eq!(split_name(".hidden"), (".hidden".to_string(), None));
    }

    #[test]
    fn test_sibling_path_keeps_directory_and_extension() {
        let file = StagedFile::from_relative(Path::new("sub/12345_p0.jpg")).unwrap();
        assert_eq!(file.base_name, "12345_p0");
        assert_eq!(file.file_name(), "12345_p0.jpg");
        assert_eq!(file.sibling_path("pixiv_12345"), "sub/pixiv_12345.jpg");

        let top = StagedFile::from_relative(Path::new("a.png")).unwrap();
        assert_eq!(top.sibling_path("b"), "b.png");
    }
}
