#![allow(dead_code)]

use std::fs;
use std::path::Path;

use media_archive_core::{AppConfig, ArchiveEngine};

/// Configuration with pixiv/yandere rules rooted in the given directories.
pub fn make_test_config(work: &Path, archive: &Path, db: &Path) -> AppConfig {
    let text = format!(
        r#"
work_dir = '{}'
archive_dir = '{}'
db_path = '{}'

[save]
excludes = ['^skip_']

[[save.rules]]
pattern = 'pixiv_(\d+)'
source = "pixiv"
metadata = {{ "1" = "pid" }}

[[save.rules]]
pattern = 'yandere_(?P<id>\d+)'
source = "yandere"

[rename]
excludes = ['^pixiv_\d+$']

[[rename.rules]]
pattern = '(\d+)_p\d+$'
template = "pixiv_{{1}}"
"#,
        work.display(),
        archive.display(),
        db.display()
    );
    AppConfig::from_toml_str(&text).unwrap()
}

pub fn make_test_engine(root: &Path) -> ArchiveEngine {
    let config = make_test_config(
        &root.join("work"),
        &root.join("archive"),
        &root.join("db").join("archive.db"),
    );
    ArchiveEngine::new(config).unwrap()
}

pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, path.display().to_string()).unwrap();
}
