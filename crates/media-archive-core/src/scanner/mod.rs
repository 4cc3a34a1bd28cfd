pub mod classify;
pub mod walk;

pub use classify::{classify_file, Classification, ClassifiedFile, Classifier, MatchedFile, Outcome};
pub use walk::{full_name, scan_files, split_name, StagedFile};
