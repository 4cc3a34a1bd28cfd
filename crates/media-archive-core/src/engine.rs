use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::analysis::{
    plan_renames, plan_save, ExecutionReport, Executor, Reconciler, RenameReport, SaveOptions,
    SaveReport, Sweep, SweepPlan,
};
use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::platform::{ArchiveFs, LocalFs};
use crate::progress::ProgressReporter;
use crate::rules::RuleBook;
use crate::scanner::{scan_files, Classifier};
use crate::storage::{Database, RecordStore};

/// Entry point for the rename, save and organize flows. Every flow is split
/// into a read-only planning step and an execution step so the plan can be
/// reported before anything changes.
pub struct ArchiveEngine<F: ArchiveFs = LocalFs> {
    config: AppConfig,
    rules: RuleBook,
    fs: F,
}

impl ArchiveEngine<LocalFs> {
    /// Compile the configured rules. Any invalid pattern or template fails here.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        Self::with_fs(config, LocalFs)
    }
}

impl<F: ArchiveFs> ArchiveEngine<F> {
    pub fn with_fs(config: AppConfig, fs: F) -> Result<Self, Error> {
        let rules = RuleBook::compile(&config)?;
        Ok(Self { config, rules, fs })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn archive_root(&self) -> PathBuf {
        PathBuf::from(&self.config.archive_dir)
    }

    pub fn work_dir(&self, explicit: Option<&str>) -> PathBuf {
        self.config.resolve_work_dir(explicit)
    }

    pub fn open_database(&self) -> Result<Database, Error> {
        if let Some(parent) = Path::new(&self.config.db_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Database::open(&self.config.db_path)?)
    }

    /// Explicit folder name, or today's dated folder with an optional split suffix.
    pub fn target_folder(&self, archive: Option<&str>, split: Option<u32>) -> String {
        match archive {
            Some(name) => name.to_string(),
            None => config::today_archive_folder(self.config.save.archive_time_offset, split),
        }
    }

    // ── Rename ───────────────────────────────────────────────────

    pub fn plan_rename(
        &self,
        work_dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<RenameReport, Error> {
        reporter.on_scan_start(&work_dir.display().to_string());
        let start = Instant::now();
        let files = scan_files(&self.fs, work_dir, &self.rules.extensions)?;
        reporter.on_scan_complete(files.len(), start.elapsed().as_secs_f64());
        let report = plan_renames(files, &self.rules.rename);
        info!(
            "Rename plan: {} to rename, {} conflicting targets",
            report.plan.len(),
            report.duplicates.len()
        );
        Ok(report)
    }

    pub fn execute_rename(
        &self,
        work_dir: &Path,
        report: &RenameReport,
        reporter: &dyn ProgressReporter,
    ) -> ExecutionReport {
        // Renames never touch the store.
        let store = NoStore;
        Executor::new(&store, &self.fs, reporter).execute_renames(work_dir, &report.plan)
    }

    // ── Save ─────────────────────────────────────────────────────

    pub fn plan_save<S: RecordStore>(
        &self,
        store: &S,
        work_dir: &Path,
        target_folder: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<SaveReport, Error> {
        reporter.on_scan_start(&work_dir.display().to_string());
        let start = Instant::now();
        let classifier = Classifier::new(
            &self.fs,
            &self.rules.classification,
            &self.rules.extensions,
        );
        let classification = classifier.classify(work_dir)?;
        reporter.on_scan_complete(classification.total(), start.elapsed().as_secs_f64());
        info!(
            "Classified {} files in {}",
            classification.total(),
            work_dir.display()
        );
        plan_save(store, classification, target_folder)
    }

    pub fn execute_save<S: RecordStore>(
        &self,
        store: &S,
        work_dir: &Path,
        report: &SaveReport,
        options: SaveOptions,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExecutionReport, Error> {
        let actions = report.actions(options);
        info!("Saving {} files into {}", actions.len(), report.target_folder);
        Executor::new(store, &self.fs, reporter).execute_save(
            work_dir,
            &self.archive_root(),
            &report.target_folder,
            &actions,
        )
    }

    // ── Organize ─────────────────────────────────────────────────

    pub fn plan_sweep<S: RecordStore>(
        &self,
        store: &S,
        sweep: Sweep,
        reporter: &dyn ProgressReporter,
    ) -> Result<SweepPlan, Error> {
        let name = sweep.to_string();
        reporter.on_sweep_start(&name);
        let start = Instant::now();
        let archive_root = self.archive_root();
        let reconciler = Reconciler::new(
            store,
            &self.fs,
            &self.rules.classification,
            &self.rules.extensions,
            &archive_root,
        );
        let plan = match sweep {
            Sweep::Unsaved => reconciler.unsaved_sweep()?,
            Sweep::Duplicate => reconciler.duplicate_sweep()?,
            Sweep::Orphan => reconciler.orphan_sweep()?,
        };
        reporter.on_sweep_complete(&name, plan.len(), start.elapsed().as_secs_f64());
        Ok(plan)
    }

    pub fn execute_sweep<S: RecordStore>(
        &self,
        store: &S,
        plan: &SweepPlan,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExecutionReport, Error> {
        Executor::new(store, &self.fs, reporter).execute_sweep(&self.archive_root(), plan)
    }
}

/// Store used where a flow has no store writes.
struct NoStore;

impl RecordStore for NoStore {
    fn query_by_key(
        &self,
        _source: &str,
        _id: &str,
    ) -> rusqlite::Result<Option<crate::storage::models::ArchiveRecord>> {
        Ok(None)
    }

    fn upsert(
        &self,
        _source: &str,
        _id: &str,
        _folder: &str,
        _filename: &str,
        _metadata: &std::collections::BTreeMap<String, String>,
        _replace: bool,
    ) -> rusqlite::Result<bool> {
        Ok(false)
    }

    fn mark_deleted(&self, _folder: &str, _filename: &str) -> rusqlite::Result<usize> {
        Ok(0)
    }

    fn list_folders(&self) -> rusqlite::Result<std::collections::BTreeSet<String>> {
        Ok(Default::default())
    }

    fn list_folder_filenames(
        &self,
        _folder: &str,
    ) -> rusqlite::Result<std::collections::BTreeSet<String>> {
        Ok(Default::default())
    }
}
