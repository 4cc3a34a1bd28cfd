mod commands;
mod logging;
mod progress;
mod report;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, ListArgs, QueryCommand};
use dotenv::dotenv;
use media_archive_core::analysis::{SaveOptions, Sweep};
use media_archive_core::export::{collect_export, write_export, ExportFormat};
use media_archive_core::storage::models::RecordFilter;
use media_archive_core::{AppConfig, ArchiveEngine};
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match media_archive_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Rename {
            work_dir,
            dry_run,
            verbose,
        }) => run_rename(config, work_dir.as_deref(), dry_run, verbose),
        Some(Commands::Save {
            work_dir,
            archive,
            split,
            replace,
            no_meta,
            dry_run,
        }) => run_save(
            config,
            work_dir.as_deref(),
            archive.as_deref(),
            split,
            SaveOptions { replace, no_meta },
            dry_run,
        ),
        Some(Commands::Organize {
            deduplicate,
            unsaved,
            mark_deleted,
            dry_run,
        }) => {
            let mut sweeps = Vec::new();
            if unsaved {
                sweeps.push(Sweep::Unsaved);
            }
            if deduplicate {
                sweeps.push(Sweep::Duplicate);
            }
            if mark_deleted {
                sweeps.push(Sweep::Orphan);
            }
            if sweeps.is_empty() {
                sweeps = vec![Sweep::Unsaved, Sweep::Duplicate, Sweep::Orphan];
            }
            run_organize(config, &sweeps, dry_run)
        }
        Some(Commands::Query { query }) => run_query(config, query),
        Some(Commands::Export {
            archive,
            source,
            output,
        }) => run_export(config, &archive, source.as_deref(), output.as_deref()),
        Some(Commands::PrintConfig) => toml::to_string_pretty(&config)
            .map(|text| println!("{}", text))
            .context("serializing configuration"),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_rename(
    config: AppConfig,
    work_dir: Option<&str>,
    dry_run: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let engine = ArchiveEngine::new(config)?;
    let reporter = CliReporter::new();
    let work_dir = engine.work_dir(work_dir);

    let plan = engine.plan_rename(&work_dir, &reporter)?;
    report::print_rename(&plan, verbose);
    if !plan.duplicates.is_empty() {
        warn!(
            "{} files share a target name and were left alone",
            plan.duplicated_count()
        );
    }

    if dry_run || plan.plan.is_empty() {
        return Ok(());
    }
    let execution = engine.execute_rename(&work_dir, &plan, &reporter);
    report::print_execution(&execution);
    Ok(())
}

fn run_save(
    config: AppConfig,
    work_dir: Option<&str>,
    archive: Option<&str>,
    split: Option<u32>,
    options: SaveOptions,
    dry_run: bool,
) -> anyhow::Result<()> {
    let engine = ArchiveEngine::new(config)?;
    let db = engine.open_database()?;
    let reporter = CliReporter::new();
    let work_dir = engine.work_dir(work_dir);
    let folder = engine.target_folder(archive, split);

    let plan = engine.plan_save(&db, &work_dir, &folder, &reporter)?;
    report::print_save(&plan);

    if dry_run || plan.actions(options).is_empty() {
        return Ok(());
    }
    let execution = engine.execute_save(&db, &work_dir, &plan, options, &reporter)?;
    report::print_execution(&execution);
    Ok(())
}

fn run_organize(config: AppConfig, sweeps: &[Sweep], dry_run: bool) -> anyhow::Result<()> {
    let engine = ArchiveEngine::new(config)?;
    let db = engine.open_database()?;
    let reporter = CliReporter::new();

    for &sweep in sweeps {
        let plan = engine.plan_sweep(&db, sweep, &reporter)?;
        report::print_sweep(&plan);
        if dry_run || plan.is_empty() {
            continue;
        }
        if sweep == Sweep::Duplicate
            && !prompt_confirm(
                &format!("Delete {} superseded files?", plan.len()),
                Some(false),
            )?
        {
            info!("Skipping duplicate sweep");
            continue;
        }
        let execution = engine.execute_sweep(&db, &plan, &reporter)?;
        report::print_execution(&execution);
    }
    Ok(())
}

fn run_query(config: AppConfig, query: QueryCommand) -> anyhow::Result<()> {
    let engine = ArchiveEngine::new(config)?;
    let db = engine.open_database()?;

    match query {
        QueryCommand::One { source, id } => match db.query_by_key(&source, &id)? {
            Some(record) => report::print_record(&record),
            None => bail!("no record for {}:{}", source, id),
        },
        QueryCommand::List(args) => {
            let records = db.query_records(&list_filter(args))?;
            for record in &records {
                report::print_record(record);
            }
            println!("{} records", records.len().to_string().cyan());
        }
    }
    Ok(())
}

fn list_filter(args: ListArgs) -> RecordFilter {
    RecordFilter {
        folder: args.folder,
        filename: args.filename,
        sources: args.sources,
        statuses: args.statuses,
        create_from: args.create_from,
        analyse_from: args.analyse_from,
        include_deleted: args.include_deleted,
        order: args.order,
        limit: args.limit,
        ..Default::default()
    }
}

fn run_export(
    config: AppConfig,
    folder: &str,
    source: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let engine = ArchiveEngine::new(config)?;
    let db = engine.open_database()?;
    let records = collect_export(&db, folder, source)?;
    info!("Exporting {} records from {}", records.len(), folder);

    match output {
        Some(path) => {
            let format = ExportFormat::from_path(path)?;
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_export(folder, &records, format, BufWriter::new(file))?;
            println!("Wrote {}", path.display().to_string().green());
        }
        None => {
            let stdout = io::stdout();
            write_export(folder, &records, ExportFormat::Json, stdout.lock())?;
            println!();
        }
    }
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
