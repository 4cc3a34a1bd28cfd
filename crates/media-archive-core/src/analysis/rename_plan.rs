use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::rules::template::TemplateError;
use crate::rules::RenameTable;
use crate::scanner::StagedFile;

/// One executable rename. Both names are paths relative to the work directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenamePlanEntry {
    pub original: String,
    pub target: String,
}

/// Target name → every original that would end up with it.
pub type DuplicateGroups = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub plan: Vec<RenamePlanEntry>,
    pub duplicates: DuplicateGroups,
}

/// Split candidate renames into a plan whose targets are unique and free of
/// reserved names, and the groups that collide. Colliding entries are never
/// planned. When a group collides with a reserved name, that name is listed last.
pub fn resolve_conflicts(candidates: Vec<RenamePlanEntry>, reserved: &BTreeSet<String>) -> Resolution {
    let mut by_target: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for candidate in candidates {
        by_target
            .entry(candidate.target)
            .or_default()
            .push(candidate.original);
    }

    let mut resolution = Resolution::default();
    for (target, mut originals) in by_target {
        if reserved.contains(&target) {
            originals.push(target.clone());
            resolution.duplicates.insert(target, originals);
        } else if originals.len() > 1 {
            resolution.duplicates.insert(target, originals);
        } else {
            resolution.plan.push(RenamePlanEntry {
                original: originals.remove(0),
                target,
            });
        }
    }
    resolution
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub scanned: usize,
    pub plan: Vec<RenamePlanEntry>,
    /// Matched files whose target is their current name.
    pub unchanged: Vec<String>,
    pub excluded: Vec<String>,
    pub unmatched: Vec<String>,
    /// Files whose rule matched but whose template failed; also listed in `unmatched`.
    pub render_failures: Vec<(String, TemplateError)>,
    pub duplicates: DuplicateGroups,
}

impl RenameReport {
    /// Files held back because of a naming conflict.
    pub fn duplicated_count(&self) -> usize {
        self.scanned
            - self.plan.len()
            - self.unchanged.len()
            - self.excluded.len()
            - self.unmatched.len()
    }

    pub fn has_unresolved(&self) -> bool {
        !self.unmatched.is_empty() || !self.duplicates.is_empty()
    }
}

/// Build the rename plan for a set of scanned files.
pub fn plan_renames(files: Vec<StagedFile>, table: &RenameTable) -> RenameReport {
    let mut report = RenameReport {
        scanned: files.len(),
        ..Default::default()
    };
    let mut candidates = Vec::new();

    for file in files {
        let original = file.display_path();
        if table.excludes().is_excluded(&file.base_name) {
            report.excluded.push(original);
            continue;
        }
        match table.rename(&file.base_name, file.extension.as_deref()) {
            Some(Ok(new_base)) => {
                let target = file.sibling_path(&new_base);
                if target == original {
                    report.unchanged.push(original);
                } else {
                    candidates.push(RenamePlanEntry { original, target });
                }
            }
            Some(Err(err)) => {
                warn!("{}: {}", original, err);
                report.render_failures.push((original.clone(), err));
                report.unmatched.push(original);
            }
            None => report.unmatched.push(original),
        }
    }

    // Files that keep their name still occupy it.
    let reserved: BTreeSet<String> = report
        .excluded
        .iter()
        .chain(report.unmatched.iter())
        .chain(report.unchanged.iter())
        .cloned()
        .collect();
    let resolution = resolve_conflicts(candidates, &reserved);
    report.plan = resolution.plan;
    report.duplicates = resolution.duplicates;

    debug!(
        "Rename plan: {} scanned, {} planned, {} excluded, {} unmatched, {} duplicated",
        report.scanned,
        report.plan.len(),
        report.excluded.len(),
        report.unmatched.len(),
        report.duplicated_count()
    );
    report
}
