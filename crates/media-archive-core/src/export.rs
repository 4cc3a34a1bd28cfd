use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::error::Error;
use crate::storage::models::{ArchiveRecord, RecordFilter, RecordStatus};
use crate::storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Pick the format from the output file extension.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(ExportFormat::Json),
            Some("csv") => Ok(ExportFormat::Csv),
            _ => Err(Error::Export(format!(
                "unsupported output file type: {}",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    folder: &'a str,
    records: &'a [ArchiveRecord],
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    source: &'a str,
    id: &'a str,
    folder: &'a str,
    filename: &'a str,
    metadata: String,
    tags: String,
    relations: String,
}

/// Analysed, live records of one archive folder.
pub fn collect_export(db: &Database, folder: &str, source: Option<&str>) -> Result<Vec<ArchiveRecord>, Error> {
    let filter = RecordFilter {
        in_folder: Some(folder.to_string()),
        sources: source.map(|s| vec![s.to_string()]).unwrap_or_default(),
        statuses: vec![RecordStatus::Analysed],
        ..Default::default()
    };
    Ok(db.query_records(&filter)?)
}

pub fn write_export<W: Write>(
    folder: &str,
    records: &[ArchiveRecord],
    format: ExportFormat,
    writer: W,
) -> Result<(), Error> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(writer, &ExportDocument { folder, records })
                .map_err(|e| Error::Export(e.to_string()))?;
        }
        ExportFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            for record in records {
                let json_or_empty = |v: &Option<serde_json::Value>| {
                    v.as_ref().map(|v| v.to_string()).unwrap_or_default()
                };
                csv_writer
                    .serialize(CsvRow {
                        source: &record.source,
                        id: &record.id,
                        folder: &record.folder,
                        filename: &record.filename,
                        metadata: serde_json::to_string(&record.metadata)
                            .map_err(|e| Error::Export(e.to_string()))?,
                        tags: json_or_empty(&record.tags),
                        relations: json_or_empty(&record.relations),
                    })
                    .map_err(|e| Error::Export(e.to_string()))?;
            }
            csv_writer.flush()?;
        }
    }
    Ok(())
}
