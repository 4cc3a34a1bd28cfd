/// Trait for reporting progress of scans, sweeps and plan execution.
///
/// The CLI implements it with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter {
    fn on_scan_start(&self, _root: &str) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_sweep_start(&self, _sweep: &str) {}
    fn on_sweep_complete(&self, _sweep: &str, _items: usize, _duration_secs: f64) {}
    fn on_execute_start(&self, _total_items: usize) {}
    fn on_execute_progress(&self, _done: usize, _total_items: usize) {}
    fn on_execute_complete(&self, _succeeded: usize, _failed: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
