//! Errors produced by this crate.
use crate::direction::Direction;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid migration filename \"{0}\"")]
    Parse(String),

    #[error("could not read migrations directory: {0}")]
    Discovery(#[from] std::io::Error),

    #[error("duplicate migration for version {version} direction {direction:?}")]
    DuplicateVersion { version: u64, direction: Direction },

    #[error("could not initialize driver: {0}")]
    DriverInit(String),

    #[error("migration \"{file}\" failed: {source}")]
    MigrationExec { file: String, source: String },

    #[error("failed to record version: {0}")]
    VersionRecord(String),

    #[error("invalid plan request: {0}")]
    Plan(String),

    #[error("unknown driver scheme \"{0}\"")]
    UnknownScheme(String),

    #[error("driver does not support the single-transaction strategy")]
    UnsupportedTransactionMode,

    #[error("database error: {0:?}")]
    Database(#[from] tokio_postgres::Error),

    #[error("mysql error: {0:?}")]
    Mysql(#[from] mysql_async::Error),

    #[error("cassandra error: {0}")]
    Cassandra(String),
}

impl Error {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }
}
