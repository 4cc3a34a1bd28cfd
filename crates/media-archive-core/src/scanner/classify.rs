use std::io;
use std::path::Path;
use tracing::{debug, warn};

use super::walk::{scan_files, StagedFile};
use crate::platform::ArchiveFs;
use crate::rules::{ExtensionFilter, Identity, RuleOutcome, RuleTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Matched(Identity),
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub file: StagedFile,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    pub file: StagedFile,
    pub identity: Identity,
}

/// Exhaustive, disjoint partition of the scanned files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub matched: Vec<MatchedFile>,
    pub unmatched: Vec<StagedFile>,
    pub excluded: Vec<StagedFile>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched.len() + self.excluded.len()
    }
}

pub struct Classifier<'a, F: ArchiveFs> {
    fs: &'a F,
    rules: &'a RuleTable,
    extensions: &'a ExtensionFilter,
}

impl<'a, F: ArchiveFs> Classifier<'a, F> {
    pub fn new(fs: &'a F, rules: &'a RuleTable, extensions: &'a ExtensionFilter) -> Self {
        Self {
            fs,
            rules,
            extensions,
        }
    }

    pub fn classify(&self, root: &Path) -> io::Result<Classification> {
        let files = scan_files(self.fs, root, self.extensions)?;
        let classification = self.classify_files(files);
        debug!(
            "{}: {} matched, {} unmatched, {} excluded",
            root.display(),
            classification.matched.len(),
            classification.unmatched.len(),
            classification.excluded.len()
        );
        Ok(classification)
    }

    pub fn classify_files(&self, files: Vec<StagedFile>) -> Classification {
        let mut result = Classification::default();
        for file in files {
            if self.rules.excludes().is_excluded(&file.base_name) {
                result.excluded.push(file);
                continue;
            }
            let classified = classify_file(self.rules, file);
            match classified.outcome {
                Outcome::Matched(identity) => result.matched.push(MatchedFile {
                    file: classified.file,
                    identity,
                }),
                Outcome::Unmatched => result.unmatched.push(classified.file),
            }
        }
        result
    }
}

/// Apply the rule table to one file. Excludes are not consulted here.
pub fn classify_file(rules: &RuleTable, file: StagedFile) -> ClassifiedFile {
    let outcome = match rules.identify(&file.base_name) {
        RuleOutcome::Identified(identity) => Outcome::Matched(identity),
        RuleOutcome::NoMatch => Outcome::Unmatched,
        RuleOutcome::MissingId => {
            warn!("{}: rule matched without an id", file.display_path());
            Outcome::Unmatched
        }
    };
    ClassifiedFile { file, outcome }
}
