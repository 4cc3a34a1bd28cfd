pub mod models;
pub mod queries;
pub mod sqlite;

pub use sqlite::Database;

use models::ArchiveRecord;
use std::collections::{BTreeMap, BTreeSet};

/// The record store as seen by the planners and the executor.
pub trait RecordStore {
    fn query_by_key(&self, source: &str, id: &str) -> rusqlite::Result<Option<ArchiveRecord>>;

    fn upsert(
        &self,
        source: &str,
        id: &str,
        folder: &str,
        filename: &str,
        metadata: &BTreeMap<String, String>,
        replace: bool,
    ) -> rusqlite::Result<bool>;

    fn mark_deleted(&self, folder: &str, filename: &str) -> rusqlite::Result<usize>;

    fn list_folders(&self) -> rusqlite::Result<BTreeSet<String>>;

    fn list_folder_filenames(&self, folder: &str) -> rusqlite::Result<BTreeSet<String>>;
}

impl RecordStore for Database {
    fn query_by_key(&self, source: &str, id: &str) -> rusqlite::Result<Option<ArchiveRecord>> {
        Database::query_by_key(self, source, id)
    }

    fn upsert(
        &self,
        source: &str,
        id: &str,
        folder: &str,
        filename: &str,
        metadata: &BTreeMap<String, String>,
        replace: bool,
    ) -> rusqlite::Result<bool> {
        Database::upsert(self, source, id, folder, filename, metadata, replace)
    }

    fn mark_deleted(&self, folder: &str, filename: &str) -> rusqlite::Result<usize> {
        Database::mark_deleted(self, folder, filename)
    }

    fn list_folders(&self) -> rusqlite::Result<BTreeSet<String>> {
        Database::list_folders(self)
    }

    fn list_folder_filenames(&self, folder: &str) -> rusqlite::Result<BTreeSet<String>> {
        Database::list_folder_filenames(self, folder)
    }
}
