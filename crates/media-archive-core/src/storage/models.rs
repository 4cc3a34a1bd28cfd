use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The pair identifying one real-world item regardless of its copies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LogicalKey {
    pub source: String,
    pub id: String,
}

impl LogicalKey {
    pub fn new(source: &str, id: &str) -> Self {
        Self {
            source: source.to_string(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    NotAnalysed,
    Analysed,
    Error,
}

impl RecordStatus {
    pub fn as_index(self) -> i64 {
        match self {
            RecordStatus::NotAnalysed => 0,
            RecordStatus::Analysed => 1,
            RecordStatus::Error => 2,
        }
    }

    pub fn from_index(index: i64) -> Self {
        match index {
            0 => RecordStatus::NotAnalysed,
            1 => RecordStatus::Analysed,
            _ => RecordStatus::Error,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::NotAnalysed => "not-analysed",
            RecordStatus::Analysed => "analysed",
            RecordStatus::Error => "error",
        };
        f.write_str(s)
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-analysed" => Ok(RecordStatus::NotAnalysed),
            "analysed" => Ok(RecordStatus::Analysed),
            "error" => Ok(RecordStatus::Error),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// One tracked item in the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveRecord {
    pub source: String,
    pub id: String,
    pub folder: String,
    pub filename: String,
    pub status: RecordStatus,
    pub deleted: bool,
    pub metadata: BTreeMap<String, String>,
    pub tags: Option<serde_json::Value>,
    pub relations: Option<serde_json::Value>,
    pub create_time: String,
    pub analyse_time: Option<String>,
}

impl ArchiveRecord {
    pub fn key(&self) -> LogicalKey {
        LogicalKey::new(&self.source, &self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    CreateTime,
    AnalyseTime,
    Status,
    Source,
    Id,
    Folder,
    Filename,
}

impl OrderField {
    pub(crate) fn column(self) -> &'static str {
        match self {
            OrderField::CreateTime => "create_time",
            OrderField::AnalyseTime => "analyse_time",
            OrderField::Status => "status",
            OrderField::Source => "source",
            OrderField::Id => "pid",
            OrderField::Folder => "folder",
            OrderField::Filename => "filename",
        }
    }
}

/// Sort key; parsed from `field` or `-field` (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub descending: bool,
}

impl FromStr for Ordering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "create-time" => OrderField::CreateTime,
            "analyse-time" => OrderField::AnalyseTime,
            "status" => OrderField::Status,
            "source" => OrderField::Source,
            "id" | "pid" => OrderField::Id,
            "folder" => OrderField::Folder,
            "filename" => OrderField::Filename,
            other => return Err(format!("unknown order field '{}'", other)),
        };
        Ok(Ordering { field, descending })
    }
}

/// Filters for listing records. Empty fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// SQL `LIKE` pattern.
    pub folder: Option<String>,
    /// Exact folder name.
    pub in_folder: Option<String>,
    /// SQL `LIKE` pattern.
    pub filename: Option<String>,
    pub sources: Vec<String>,
    pub statuses: Vec<RecordStatus>,
    pub create_from: Option<String>,
    pub analyse_from: Option<String>,
    pub include_deleted: bool,
    pub order: Vec<Ordering>,
    pub limit: Option<i64>,
}
