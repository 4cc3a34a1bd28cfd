pub mod executor;
pub mod reconcile;
pub mod rename_plan;
pub mod save_plan;

pub use executor::{ExecutionReport, Executor, ItemFailure};
pub use reconcile::{ArchiveLocation, ReconciliationOutcome, Reconciler, Sweep, SweepPlan};
pub use rename_plan::{plan_renames, resolve_conflicts, DuplicateGroups, RenamePlanEntry, RenameReport, Resolution};
pub use save_plan::{plan_save, ExistingItem, SaveAction, SaveItem, SaveOptions, SaveReport};
