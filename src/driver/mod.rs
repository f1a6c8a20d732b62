//! The driver trait every concrete backend implements, and the registry
//! that dispatches a connection URL's scheme to the right one.
mod cassandra;
mod mysql;
mod postgres;
mod shell;
mod statement;

pub use cassandra::CassandraDriver;
pub use mysql::MysqlDriver;
pub use postgres::PostgresDriver;
pub use shell::ShellDriver;

use std::str::FromStr;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::direction::Version;
use crate::error::Error;
use crate::event::Event;
use crate::file::File;

/// How a plan's execution is wrapped in backend transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Each file's SQL and the version update are issued without
    /// explicit transaction framing.
    None,
    /// Each file is wrapped in its own transaction.
    PerFile,
    /// All files in a plan execute inside one enclosing transaction
    /// opened by the executor.
    Single,
}

impl FromStr for TransactionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TransactionMode::None),
            "perfile" => Ok(TransactionMode::PerFile),
            "single" => Ok(TransactionMode::Single),
            other => Err(Error::Plan(format!("unknown transaction mode \"{other}\""))),
        }
    }
}

/// Capabilities every backend driver must provide.
#[async_trait]
pub trait Driver: Send {
    /// Returns the extension (without a leading dot) this driver's
    /// migration scripts are written in.
    fn filename_extension(&self) -> &'static str;

    /// Applies a single file, streaming progress and errors on
    /// `events`. Closes `events` (by dropping the sender) when done.
    async fn migrate(&mut self, file: File, events: mpsc::Sender<Event>);

    /// The currently recorded version, or `0` if none has been applied.
    async fn version(&mut self) -> Result<Version, Error>;

    /// Releases the underlying connection.
    async fn close(&mut self) -> Result<(), Error>;

    /// Whether this driver can be used with [`TransactionMode::Single`].
    fn supports_single_transaction(&self) -> bool {
        false
    }

    /// Begins the plan-wide transaction used by
    /// [`TransactionMode::Single`]. Only called when
    /// [`Driver::supports_single_transaction`] is `true`.
    async fn begin_single(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Commits the plan-wide transaction.
    async fn commit_single(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Rolls back the plan-wide transaction.
    async fn rollback_single(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Connects to `url` and returns the driver appropriate for its scheme.
///
/// Unlike the upstream `verifyFilenameExtension`, a driver whose
/// `filename_extension()` is empty or dot-prefixed is a constructor-time
/// `Error`, not a panic: a misconfigured *driver* should not be able to
/// abort the *caller's* process.
pub async fn connect(url: &str, txn_mode: TransactionMode) -> Result<Box<dyn Driver>, Error> {
    let parsed = Url::parse(url).map_err(|e| Error::DriverInit(e.to_string()))?;

    let driver: Box<dyn Driver> = match parsed.scheme() {
        "postgres" => Box::new(PostgresDriver::initialize(url, txn_mode).await?),
        "mysql" => {
            if txn_mode == TransactionMode::Single {
                return Err(Error::UnsupportedTransactionMode);
            }
            Box::new(MysqlDriver::initialize(url).await?)
        }
        "cassandra" => Box::new(CassandraDriver::initialize(url).await?),
        "bash" => Box::new(ShellDriver::initialize(url).await?),
        other => return Err(Error::UnknownScheme(other.to_string())),
    };

    verify_filename_extension(&*driver)?;

    Ok(driver)
}

fn verify_filename_extension(driver: &dyn Driver) -> Result<(), Error> {
    let ext = driver.filename_extension();
    if ext.is_empty() || ext.starts_with('.') {
        return Err(Error::DriverInit(format!(
            "driver returned an invalid filename extension: \"{ext}\""
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transaction_mode_parsing() {
        assert_eq!("none".parse::<TransactionMode>().unwrap(), TransactionMode::None);
        assert_eq!("None".parse::<TransactionMode>().unwrap(), TransactionMode::None);
        assert_eq!("PERFILE".parse::<TransactionMode>().unwrap(), TransactionMode::PerFile);
        assert_eq!("single".parse::<TransactionMode>().unwrap(), TransactionMode::Single);
        assert!("whatever".parse::<TransactionMode>().is_err());
    }

    #[tokio::test]
    async fn test_unknown_scheme_rejected() {
        let result = connect("redis://localhost/0", TransactionMode::None).await;
        assert!(matches!(result, Err(Error::UnknownScheme(_))));
    }
}
