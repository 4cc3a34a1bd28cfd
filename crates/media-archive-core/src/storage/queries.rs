use super::models::*;
use super::sqlite::Database;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Result, Row};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const RECORD_COLUMNS: &str = "source, pid, folder, filename, status, deleted, metadata, tags, \
                              relations, create_time, analyse_time";

fn parse_json<T: serde::de::DeserializeOwned>(
    column: usize,
    text: Option<String>,
) -> Result<Option<T>> {
    match text {
        Some(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        }),
        None => Ok(None),
    }
}

fn record_from_row(row: &Row) -> Result<ArchiveRecord> {
    Ok(ArchiveRecord {
        source: row.get(0)?,
        id: row.get(1)?,
        folder: row.get(2)?,
        filename: row.get(3)?,
        status: RecordStatus::from_index(row.get(4)?),
        deleted: row.get(5)?,
        metadata: parse_json(6, row.get(6)?)?.unwrap_or_default(),
        tags: parse_json(7, row.get(7)?)?,
        relations: parse_json(8, row.get(8)?)?,
        create_time: row.get(9)?,
        analyse_time: row.get(10)?,
    })
}

fn metadata_json(metadata: &BTreeMap<String, String>) -> Option<String> {
    if metadata.is_empty() {
        None
    } else {
        serde_json::to_string(metadata).ok()
    }
}

impl Database {
    // ── Single records ───────────────────────────────────────────

    /// Look up a record by logical key, including soft-deleted ones.
    pub fn query_by_key(&self, source: &str, id: &str) -> Result<Option<ArchiveRecord>> {
        self.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM archive_record WHERE source = ?1 AND pid = ?2",
                    RECORD_COLUMNS
                ),
                params![source, id],
                record_from_row,
            )
            .optional()
    }

    /// Insert a record for a new key. For an existing key the location is
    /// overwritten when `replace` is set or the record was soft-deleted;
    /// otherwise nothing changes. Returns whether a row was created.
    pub fn upsert(
        &self,
        source: &str,
        id: &str,
        folder: &str,
        filename: &str,
        metadata: &BTreeMap<String, String>,
        replace: bool,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let existing: Option<bool> = self
            .connection()
            .query_row(
                "SELECT deleted FROM archive_record WHERE source = ?1 AND pid = ?2",
                params![source, id],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => {
                self.connection().execute(
                    "INSERT INTO archive_record \
                     (source, pid, status, folder, filename, deleted, metadata, create_time) \
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
                    params![
                        source,
                        id,
                        RecordStatus::NotAnalysed.as_index(),
                        folder,
                        filename,
                        metadata_json(metadata),
                        now
                    ],
                )?;
                debug!("Created record {}:{} at {}/{}", source, id, folder, filename);
                Ok(true)
            }
            Some(deleted) if deleted || replace => {
                self.connection().execute(
                    "UPDATE archive_record SET folder = ?1, filename = ?2, deleted = 0, \
                     metadata = COALESCE(?3, metadata), create_time = ?4 \
                     WHERE source = ?5 AND pid = ?6",
                    params![folder, filename, metadata_json(metadata), now, source, id],
                )?;
                debug!("Relocated record {}:{} to {}/{}", source, id, folder, filename);
                Ok(false)
            }
            Some(_) => Ok(false),
        }
    }

    pub fn mark_deleted(&self, folder: &str, filename: &str) -> Result<usize> {
        let count = self.connection().execute(
            "UPDATE archive_record SET deleted = 1 \
             WHERE folder = ?1 AND filename = ?2 AND deleted = 0",
            params![folder, filename],
        )?;
        Ok(count)
    }

    /// Record the result of a metadata fetch for a key. This is the write
    /// side for an external fetcher; `export` and `query list --status`
    /// read what it stores.
    pub fn update_analysis(
        &self,
        source: &str,
        id: &str,
        status: RecordStatus,
        tags: Option<&serde_json::Value>,
        relations: Option<&serde_json::Value>,
    ) -> Result<usize> {
        let now = chrono::Utc::now().to_rfc3339();
        let count = self.connection().execute(
            "UPDATE archive_record SET status = ?1, tags = COALESCE(?2, tags), \
             relations = COALESCE(?3, relations), analyse_time = ?4 \
             WHERE source = ?5 AND pid = ?6",
            params![
                status.as_index(),
                tags.map(|t| t.to_string()),
                relations.map(|r| r.to_string()),
                now,
                source,
                id
            ],
        )?;
        Ok(count)
    }

    // ── Folder views ─────────────────────────────────────────────

    /// Folders holding at least one live record.
    pub fn list_folders(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT DISTINCT folder FROM archive_record WHERE deleted = 0")?;
        let folders = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<BTreeSet<String>>>()?;
        Ok(folders)
    }

    pub fn list_folder_filenames(&self, folder: &str) -> Result<BTreeSet<String>> {
        let mut stmt = self.connection().prepare(
            "SELECT filename FROM archive_record WHERE folder = ?1 AND deleted = 0",
        )?;
        let names = stmt
            .query_map(params![folder], |row| row.get(0))?
            .collect::<Result<BTreeSet<String>>>()?;
        Ok(names)
    }

    // ── Listing ──────────────────────────────────────────────────

    pub fn query_records(&self, filter: &RecordFilter) -> Result<Vec<ArchiveRecord>> {
        let mut sql = format!("SELECT {} FROM archive_record", RECORD_COLUMNS);
        let mut wheres: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !filter.include_deleted {
            wheres.push("deleted = 0".to_string());
        }
        if let Some(folder) = &filter.folder {
            wheres.push("folder LIKE ?".to_string());
            values.push(Value::Text(folder.clone()));
        }
        if let Some(folder) = &filter.in_folder {
            wheres.push("folder = ?".to_string());
            values.push(Value::Text(folder.clone()));
        }
        if let Some(filename) = &filter.filename {
            wheres.push("filename LIKE ?".to_string());
            values.push(Value::Text(filename.clone()));
        }
        if !filter.sources.is_empty() {
            let marks = vec!["?"; filter.sources.len()].join(", ");
            wheres.push(format!("source IN ({})", marks));
            values.extend(filter.sources.iter().cloned().map(Value::Text));
        }
        if !filter.statuses.is_empty() {
            let marks = vec!["?"; filter.statuses.len()].join(", ");
            wheres.push(format!("status IN ({})", marks));
            values.extend(filter.statuses.iter().map(|s| Value::Integer(s.as_index())));
        }
        if let Some(from) = &filter.create_from {
            wheres.push("create_time >= ?".to_string());
            values.push(Value::Text(from.clone()));
        }
        if let Some(from) = &filter.analyse_from {
            wheres.push("analyse_time >= ?".to_string());
            values.push(Value::Text(from.clone()));
        }
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres.join(" AND "));
        }

        if filter.order.is_empty() {
            sql.push_str(" ORDER BY id");
        } else {
            let orders: Vec<String> = filter
                .order
                .iter()
                .map(|o| {
                    format!(
                        "{}{}",
                        o.field.column(),
                        if o.descending { " DESC" } else { "" }
                    )
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit));
        }

        let mut stmt = self.connection().prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values), record_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }
}
