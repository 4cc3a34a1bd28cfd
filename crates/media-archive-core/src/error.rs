use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid rule '{pattern}': {reason}")]
    Rule { pattern: String, reason: String },

    #[error("Export error: {0}")]
    Export(String),
}

impl Error {
    pub(crate) fn rule(pattern: &str, reason: impl ToString) -> Self {
        Error::Rule {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }
}
