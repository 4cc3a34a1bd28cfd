use colored::*;
use media_archive_core::analysis::{
    ExecutionReport, ReconciliationOutcome, RenameReport, SaveReport, SweepPlan,
};
use media_archive_core::storage::models::ArchiveRecord;

fn section(title: &str, count: usize) {
    println!("{} ({})", title.bold(), count);
}

fn list<I: IntoIterator<Item = S>, S: AsRef<str>>(items: I) {
    for item in items {
        println!("    {}", item.as_ref());
    }
}

pub fn print_rename(report: &RenameReport, verbose: bool) {
    println!();
    println!("Scanned {} files", report.scanned.to_string().cyan());

    section("Rename", report.plan.len());
    for entry in &report.plan {
        println!("    {} -> {}", entry.original, entry.target.green());
    }

    if !report.duplicates.is_empty() {
        section(
            &"Conflicting targets".red().to_string(),
            report.duplicates.len(),
        );
        for (target, originals) in &report.duplicates {
            println!("    {}", target.red());
            list(originals.iter().map(|o| format!("  <- {}", o)));
        }
    }

    if !report.unmatched.is_empty() {
        section(&"Unmatched".yellow().to_string(), report.unmatched.len());
        list(&report.unmatched);
    }

    if !report.render_failures.is_empty() {
        section(
            &"Template failures".yellow().to_string(),
            report.render_failures.len(),
        );
        for (file, err) in &report.render_failures {
            println!("    {}: {}", file, err);
        }
    }

    if verbose {
        section("Unchanged", report.unchanged.len());
        list(&report.unchanged);
        section("Excluded", report.excluded.len());
        list(&report.excluded);
    } else {
        println!(
            "{} unchanged, {} excluded",
            report.unchanged.len(),
            report.excluded.len()
        );
    }
}

pub fn print_save(report: &SaveReport) {
    println!();
    println!(
        "Scanned {} files for {}",
        report.scanned.to_string().cyan(),
        report.target_folder.bold()
    );

    section("Archive", report.archive.len());
    for item in &report.archive {
        println!("    {} {}", item.file, format!("[{}]", item.key).green());
    }

    if !report.existing.is_empty() {
        section(&"Already archived".yellow().to_string(), report.existing.len());
        for existing in &report.existing {
            println!(
                "    {} {} at {}",
                existing.item.file,
                format!("[{}]", existing.item.key).yellow(),
                existing.existing
            );
        }
    }

    if !report.repeated.is_empty() {
        section(&"Repeated in batch".yellow().to_string(), report.repeated.len());
        for repeated in &report.repeated {
            println!(
                "    {} {} same key as {}",
                repeated.item.file,
                format!("[{}]", repeated.item.key).yellow(),
                repeated.existing
            );
        }
    }

    if !report.unmatched.is_empty() {
        section(&"Unmatched".yellow().to_string(), report.unmatched.len());
        list(&report.unmatched);
    }

    if !report.excluded.is_empty() {
        section("Excluded", report.excluded.len());
        list(&report.excluded);
    }
}

pub fn print_sweep(plan: &SweepPlan) {
    println!();
    section(&format!("{} sweep", plan.sweep), plan.len());
    for item in &plan.items {
        match item {
            ReconciliationOutcome::Unsaved { key, location, .. } => {
                println!("    {} {}", location, format!("[{}]", key).green());
            }
            ReconciliationOutcome::SupersededCopy {
                key,
                location,
                canonical,
            } => {
                println!(
                    "    {} {} newer copy in {}",
                    location.to_string().red(),
                    format!("[{}]", key).dimmed(),
                    canonical
                );
            }
            ReconciliationOutcome::CanonicalRelocated {
                key, stored, actual, ..
            } => {
                println!(
                    "    {} record {} -> {}",
                    format!("[{}]", key).cyan(),
                    stored,
                    actual.to_string().green()
                );
            }
            ReconciliationOutcome::Orphaned { location } => {
                println!("    {}", location.to_string().red());
            }
        }
    }
}

pub fn print_execution(report: &ExecutionReport) {
    if report.failed.is_empty() {
        println!("{} items applied", report.succeeded.to_string().green());
        return;
    }
    println!(
        "{} items applied, {} failed",
        report.succeeded.to_string().green(),
        report.failed.len().to_string().red()
    );
    for failure in &report.failed {
        println!("    {}: {}", failure.item.red(), failure.reason);
    }
}

pub fn print_record(record: &ArchiveRecord) {
    let deleted = if record.deleted {
        " (deleted)".red().to_string()
    } else {
        String::new()
    };
    println!(
        "{} {}/{} {}{}",
        format!("[{}]", record.key()).cyan(),
        record.folder,
        record.filename,
        record.status.to_string().dimmed(),
        deleted
    );
    if !record.metadata.is_empty() {
        let pairs: Vec<String> = record
            .metadata
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        println!("    {}", pairs.join(", "));
    }
    println!("    created {}", record.create_time);
    if let Some(analysed) = &record.analyse_time {
        println!("    analysed {}", analysed);
    }
}
