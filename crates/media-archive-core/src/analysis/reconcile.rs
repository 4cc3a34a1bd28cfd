use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Error;
use crate::platform::{to_slash_path, ArchiveFs};
use crate::rules::{ExtensionFilter, RuleTable};
use crate::scanner::{Classification, Classifier};
use crate::storage::models::LogicalKey;
use crate::storage::RecordStore;

/// A file inside an archive folder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArchiveLocation {
    pub folder: String,
    pub filename: String,
}

impl ArchiveLocation {
    pub fn new(folder: &str, filename: &str) -> Self {
        Self {
            folder: folder.to_string(),
            filename: filename.to_string(),
        }
    }
}

impl fmt::Display for ArchiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder, self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// A matched file with no live record. Scheduled for insert.
    Unsaved {
        key: LogicalKey,
        location: ArchiveLocation,
        metadata: BTreeMap<String, String>,
    },
    /// An older copy of a key seen in a newer folder. Scheduled for deletion.
    SupersededCopy {
        key: LogicalKey,
        location: ArchiveLocation,
        canonical: ArchiveLocation,
    },
    /// The record points at another folder than the canonical copy. Scheduled for update.
    CanonicalRelocated {
        key: LogicalKey,
        stored: ArchiveLocation,
        actual: ArchiveLocation,
        metadata: BTreeMap<String, String>,
    },
    /// A live record whose file is gone. Scheduled for soft delete.
    Orphaned { location: ArchiveLocation },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sweep {
    Unsaved,
    Duplicate,
    Orphan,
}

impl fmt::Display for Sweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sweep::Unsaved => "unsaved",
            Sweep::Duplicate => "duplicate",
            Sweep::Orphan => "orphan",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    pub sweep: Sweep,
    pub items: Vec<ReconciliationOutcome>,
}

impl SweepPlan {
    fn new(sweep: Sweep) -> Self {
        Self {
            sweep,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Compares archive folders on disk with the record store. Every sweep is
/// read-only; the resulting plans are applied by the executor.
pub struct Reconciler<'a, S: RecordStore, F: ArchiveFs> {
    store: &'a S,
    fs: &'a F,
    rules: &'a RuleTable,
    extensions: &'a ExtensionFilter,
    archive_root: &'a Path,
}

impl<'a, S: RecordStore, F: ArchiveFs> Reconciler<'a, S, F> {
    pub fn new(
        store: &'a S,
        fs: &'a F,
        rules: &'a RuleTable,
        extensions: &'a ExtensionFilter,
        archive_root: &'a Path,
    ) -> Self {
        Self {
            store,
            fs,
            rules,
            extensions,
            archive_root,
        }
    }

    /// Archive folder names, newest first. Folder names are dates, so reverse
    /// lexical order approximates recency.
    pub fn folders_newest_first(&self) -> Result<Vec<String>, Error> {
        if !self.fs.exists(self.archive_root) {
            return Ok(Vec::new());
        }
        let mut folders = self.fs.list_dirs(self.archive_root)?;
        folders.sort_by(|a, b| b.cmp(a));
        Ok(folders)
    }

    fn classify_folder(&self, folder: &str) -> Result<Classification, Error> {
        let classifier = Classifier::new(self.fs, self.rules, self.extensions);
        Ok(classifier.classify(&self.archive_root.join(folder))?)
    }

    /// Matched files whose key has no live record.
    pub fn unsaved_sweep(&self) -> Result<SweepPlan, Error> {
        let mut plan = SweepPlan::new(Sweep::Unsaved);
        for folder in self.folders_newest_first()? {
            for matched in self.classify_folder(&folder)?.matched {
                let identity = matched.identity;
                let record = self.store.query_by_key(&identity.source, &identity.id)?;
                if record.map_or(true, |r| r.deleted) {
                    plan.items.push(ReconciliationOutcome::Unsaved {
                        key: LogicalKey::new(&identity.source, &identity.id),
                        location: ArchiveLocation::new(&folder, &matched.file.display_path()),
                        metadata: identity.metadata,
                    });
                }
            }
        }
        info!("Unsaved sweep: {} files without a record", plan.len());
        Ok(plan)
    }

    /// Single pass over folders in descending order. The first folder holding
    /// a key is canonical and costs one store query; every later sighting is
    /// an older copy. Within that folder the file the record points at is
    /// kept, otherwise the first one. Correctness depends on the descending
    /// folder order.
    pub fn duplicate_sweep(&self) -> Result<SweepPlan, Error> {
        let mut plan = SweepPlan::new(Sweep::Duplicate);
        let mut canonical: HashMap<LogicalKey, ArchiveLocation> = HashMap::new();
        let mut store_queries = 0usize;

        for folder in self.folders_newest_first()? {
            for (key, mut copies) in group_by_key(&folder, self.classify_folder(&folder)?) {
                if let Some(newest) = canonical.get(&key) {
                    for (location, _) in copies {
                        plan.items.push(ReconciliationOutcome::SupersededCopy {
                            key: key.clone(),
                            location,
                            canonical: newest.clone(),
                        });
                    }
                    continue;
                }

                store_queries += 1;
                let record = self.store.query_by_key(&key.source, &key.id)?;
                let stored = record
                    .as_ref()
                    .map(|r| ArchiveLocation::new(&r.folder, &r.filename));
                let keep = copies
                    .iter()
                    .position(|(location, _)| Some(location) == stored.as_ref())
                    .unwrap_or(0);
                let (location, metadata) = copies.remove(keep);

                if let (Some(record), Some(stored)) = (record, stored) {
                    if stored != location || record.deleted {
                        plan.items.push(ReconciliationOutcome::CanonicalRelocated {
                            key: key.clone(),
                            stored,
                            actual: location.clone(),
                            metadata,
                        });
                    }
                }
                for (older, _) in copies {
                    plan.items.push(ReconciliationOutcome::SupersededCopy {
                        key: key.clone(),
                        location: older,
                        canonical: location.clone(),
                    });
                }
                canonical.insert(key, location);
            }
        }

        debug!(
            "Duplicate sweep: {} distinct keys, {} store queries",
            canonical.len(),
            store_queries
        );
        info!("Duplicate sweep: {} items", plan.len());
        Ok(plan)
    }

    /// Live records whose file is missing from its archive folder.
    pub fn orphan_sweep(&self) -> Result<SweepPlan, Error> {
        let mut plan = SweepPlan::new(Sweep::Orphan);
        for folder in self.store.list_folders()? {
            let on_disk: BTreeSet<String> = self
                .fs
                .list_files(&self.archive_root.join(&folder))?
                .iter()
                .map(|p| to_slash_path(p))
                .collect();
            for filename in self.store.list_folder_filenames(&folder)? {
                if !on_disk.contains(&filename) {
                    plan.items.push(ReconciliationOutcome::Orphaned {
                        location: ArchiveLocation::new(&folder, &filename),
                    });
                }
            }
        }
        info!("Orphan sweep: {} records without a file", plan.len());
        Ok(plan)
    }
}

type Copies = Vec<(ArchiveLocation, BTreeMap<String, String>)>;

/// Matched files of one folder grouped by key, in first-seen order.
fn group_by_key(folder: &str, classification: Classification) -> Vec<(LogicalKey, Copies)> {
    let mut groups: Vec<(LogicalKey, Copies)> = Vec::new();
    let mut index: HashMap<LogicalKey, usize> = HashMap::new();
    for matched in classification.matched {
        let identity = matched.identity;
        let key = LogicalKey::new(&identity.source, &identity.id);
        let copy = (
            ArchiveLocation::new(folder, &matched.file.display_path()),
            identity.metadata,
        );
        match index.get(&key) {
            Some(&i) => groups[i].1.push(copy),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![copy]));
            }
        }
    }
    groups
}
