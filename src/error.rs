use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid filename template: {0}")]
    Template(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(
        "Audit failed: {total} records, {keeps} keep, {deletes} delete, \
         {unset} without disposition, {missing_targets} keepers without target"
    )]
    AuditFailed {
        total: i64,
        keeps: i64,
        deletes: i64,
        unset: i64,
        missing_targets: i64,
    },

    #[error("{0}")]
    Other(String),
}
