use std::path::Path;
use tracing::{debug, error, info};

use super::reconcile::{ReconciliationOutcome, SweepPlan};
use super::rename_plan::RenamePlanEntry;
use super::save_plan::SaveAction;
use crate::error::Error;
use crate::platform::ArchiveFs;
use crate::progress::ProgressReporter;
use crate::storage::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub succeeded: usize,
    pub failed: Vec<ItemFailure>,
}

impl ExecutionReport {
    fn fail(&mut self, item: String, reason: impl ToString) {
        let reason = reason.to_string();
        error!("Failed on '{}': {}", item, reason);
        self.failed.push(ItemFailure { item, reason });
    }
}

/// Applies plans item by item. A filesystem failure is recorded and the
/// remaining items still run. Store writes happen only after the matching
/// filesystem step succeeded, so an interrupted run leaves the filesystem
/// ahead of the store, which the unsaved sweep repairs.
pub struct Executor<'a, S: RecordStore, F: ArchiveFs> {
    store: &'a S,
    fs: &'a F,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, S: RecordStore, F: ArchiveFs> Executor<'a, S, F> {
    pub fn new(store: &'a S, fs: &'a F, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            store,
            fs,
            reporter,
        }
    }

    pub fn execute_renames(&self, work_dir: &Path, plan: &[RenamePlanEntry]) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        self.reporter.on_execute_start(plan.len());
        for (done, entry) in plan.iter().enumerate() {
            let from = work_dir.join(&entry.original);
            let to = work_dir.join(&entry.target);
            match self.fs.move_file(&from, &to) {
                Ok(()) => {
                    debug!("Renamed {} -> {}", entry.original, entry.target);
                    report.succeeded += 1;
                }
                Err(e) => report.fail(format!("{} -> {}", entry.original, entry.target), e),
            }
            self.reporter.on_execute_progress(done + 1, plan.len());
        }
        self.finish(&report);
        report
    }

    pub fn execute_save(
        &self,
        work_dir: &Path,
        archive_root: &Path,
        folder: &str,
        actions: &[SaveAction],
    ) -> Result<ExecutionReport, Error> {
        let mut report = ExecutionReport::default();
        let target_dir = archive_root.join(folder);
        self.reporter.on_execute_start(actions.len());

        for (done, action) in actions.iter().enumerate() {
            let file = action.file();
            if let Err(e) = self.fs.move_file(&work_dir.join(file), &target_dir.join(file)) {
                report.fail(file.to_string(), e);
                self.reporter.on_execute_progress(done + 1, actions.len());
                continue;
            }
            match action {
                SaveAction::Archive(item) | SaveAction::Replace(item) => {
                    let replace = matches!(action, SaveAction::Replace(_));
                    self.store.upsert(
                        &item.key.source,
                        &item.key.id,
                        folder,
                        &item.file,
                        &item.metadata,
                        replace,
                    )?;
                }
                SaveAction::MoveOnly(_) => {}
            }
            debug!("Archived {} into {}", file, folder);
            report.succeeded += 1;
            self.reporter.on_execute_progress(done + 1, actions.len());
        }

        self.finish(&report);
        Ok(report)
    }

    pub fn execute_sweep(&self, archive_root: &Path, plan: &SweepPlan) -> Result<ExecutionReport, Error> {
        let mut report = ExecutionReport::default();
        self.reporter.on_execute_start(plan.len());

        for (done, item) in plan.items.iter().enumerate() {
            match item {
                ReconciliationOutcome::Unsaved {
                    key,
                    location,
                    metadata,
                } => {
                    let created = self.store.upsert(
                        &key.source,
                        &key.id,
                        &location.folder,
                        &location.filename,
                        metadata,
                        false,
                    )?;
                    debug!("Saved {} at {} (created: {})", key, location, created);
                    report.succeeded += 1;
                }
                ReconciliationOutcome::SupersededCopy { location, .. } => {
                    let path = archive_root.join(&location.folder).join(&location.filename);
                    match self.fs.delete_file(&path) {
                        Ok(()) => {
                            debug!("Deleted superseded copy {}", location);
                            report.succeeded += 1;
                        }
                        Err(e) => report.fail(location.to_string(), e),
                    }
                }
                ReconciliationOutcome::CanonicalRelocated {
                    key,
                    actual,
                    metadata,
                    ..
                } => {
                    self.store.upsert(
                        &key.source,
                        &key.id,
                        &actual.folder,
                        &actual.filename,
                        metadata,
                        true,
                    )?;
                    debug!("Repointed {} to {}", key, actual);
                    report.succeeded += 1;
                }
                ReconciliationOutcome::Orphaned { location } => {
                    self.store.mark_deleted(&location.folder, &location.filename)?;
                    debug!("Marked {} deleted", location);
                    report.succeeded += 1;
                }
            }
            self.reporter.on_execute_progress(done + 1, plan.len());
        }

        self.finish(&report);
        Ok(report)
    }

    fn finish(&self, report: &ExecutionReport) {
        self.reporter
            .on_execute_complete(report.succeeded, report.failed.len());
        info!(
            "Plan executed: {} succeeded, {} failed",
            report.succeeded,
            report.failed.len()
        );
    }
}
