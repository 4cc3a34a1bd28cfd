use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::reconcile::ArchiveLocation;
use crate::error::Error;
use crate::scanner::Classification;
use crate::storage::models::LogicalKey;
use crate::storage::RecordStore;

/// A staged file whose key can be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveItem {
    /// Path relative to the work directory.
    pub file: String,
    pub key: LogicalKey,
    pub metadata: BTreeMap<String, String>,
}

/// A staged file whose key is already archived elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingItem {
    pub item: SaveItem,
    pub existing: ArchiveLocation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Archive files whose key already exists and repoint the record.
    pub replace: bool,
    /// Archive unmatched files without creating records.
    pub no_meta: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
    Archive(SaveItem),
    Replace(SaveItem),
    MoveOnly(String),
}

impl SaveAction {
    pub fn file(&self) -> &str {
        match self {
            SaveAction::Archive(item) | SaveAction::Replace(item) => &item.file,
            SaveAction::MoveOnly(file) => file,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub target_folder: String,
    pub scanned: usize,
    pub archive: Vec<SaveItem>,
    pub existing: Vec<ExistingItem>,
    /// Files whose key already appears earlier in this batch. Never moved.
    pub repeated: Vec<ExistingItem>,
    pub unmatched: Vec<String>,
    pub excluded: Vec<String>,
}

impl SaveReport {
    /// Actions to perform for the given options. Older copies of replaced
    /// keys stay in place; the duplicate sweep removes them later.
    pub fn actions(&self, options: SaveOptions) -> Vec<SaveAction> {
        let mut actions: Vec<SaveAction> = self.archive.iter().cloned().map(SaveAction::Archive).collect();
        if options.replace {
            actions.extend(
                self.existing
                    .iter()
                    .map(|e| SaveAction::Replace(e.item.clone())),
            );
        }
        if options.no_meta {
            actions.extend(self.unmatched.iter().cloned().map(SaveAction::MoveOnly));
        }
        actions
    }
}

/// Decide what happens to each classified staged file when it is saved into
/// `target_folder`. A key seen twice in one batch is archived once; later
/// files are reported as repeated and stay in the work directory.
pub fn plan_save<S: RecordStore>(
    store: &S,
    classification: Classification,
    target_folder: &str,
) -> Result<SaveReport, Error> {
    let mut report = SaveReport {
        target_folder: target_folder.to_string(),
        scanned: classification.total(),
        archive: Vec::new(),
        existing: Vec::new(),
        repeated: Vec::new(),
        unmatched: classification.unmatched.iter().map(|f| f.display_path()).collect(),
        excluded: classification.excluded.iter().map(|f| f.display_path()).collect(),
    };
    let mut in_batch: HashMap<LogicalKey, String> = HashMap::new();

    for matched in classification.matched {
        let key = LogicalKey::new(&matched.identity.source, &matched.identity.id);
        let item = SaveItem {
            file: matched.file.display_path(),
            key: key.clone(),
            metadata: matched.identity.metadata,
        };

        if let Some(first) = in_batch.get(&key) {
            report.repeated.push(ExistingItem {
                existing: ArchiveLocation::new(target_folder, first),
                item,
            });
            continue;
        }

        match store.query_by_key(&key.source, &key.id)? {
            Some(record) if !record.deleted => report.existing.push(ExistingItem {
                item,
                existing: ArchiveLocation::new(&record.folder, &record.filename),
            }),
            _ => {
                in_batch.insert(key, item.file.clone());
                report.archive.push(item);
            }
        }
    }

    debug!(
        "Save plan into {}: {} new, {} existing, {} repeated, {} unmatched",
        target_folder,
        report.archive.len(),
        report.existing.len(),
        report.repeated.len(),
        report.unmatched.len()
    );
    Ok(report)
}
