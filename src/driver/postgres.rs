//! The transactional relational driver. Supports all three transaction
//! strategies described in `TransactionMode`.
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

use super::{Driver, TransactionMode};
use crate::direction::Version;
use crate::error::Error;
use crate::event::Event;
use crate::file::File;

const CREATE_BOOKKEEPING_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (version BIGINT NOT NULL PRIMARY KEY)";

pub struct PostgresDriver {
    client: Client,
    connection: tokio::task::JoinHandle<()>,
    txn_mode: TransactionMode,
    in_single_transaction: bool,
}

impl PostgresDriver {
    pub async fn initialize(url: &str, txn_mode: TransactionMode) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| Error::DriverInit(e.to_string()))?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection error: {e}");
            }
        });

        client
            .batch_execute(CREATE_BOOKKEEPING_TABLE)
            .await
            .map_err(|e| Error::DriverInit(e.to_string()))?;

        Ok(Self {
            client,
            connection,
            txn_mode,
            in_single_transaction: false,
        })
    }

    async fn current_version(&self) -> Result<Version, Error> {
        let row = self
            .client
            .query_opt("SELECT version FROM schema_migrations LIMIT 1", &[])
            .await?;
        Ok(row.map(|r| r.get::<_, i64>(0) as Version).unwrap_or(0))
    }

    async fn set_version(&self, version: Version) -> Result<(), Error> {
        self.client
            .execute("DELETE FROM schema_migrations", &[])
            .await
            .map_err(|e| Error::VersionRecord(e.to_string()))?;
        self.client
            .execute(
                "INSERT INTO schema_migrations (version) VALUES ($1)",
                &[&(version as i64)],
            )
            .await
            .map_err(|e| Error::VersionRecord(e.to_string()))?;
        Ok(())
    }

    async fn apply(&self, file: &File) -> Result<(), Error> {
        let sql = String::from_utf8_lossy(file.content.as_deref().unwrap_or(&[])).into_owned();
        if sql.trim().is_empty() {
            return Ok(());
        }
        self.client
            .batch_execute(&sql)
            .await
            .map_err(|e| Error::MigrationExec {
                file: file.file_name.clone(),
                source: e.to_string(),
            })
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn filename_extension(&self) -> &'static str {
        "sql"
    }

    async fn migrate(&mut self, mut file: File, events: mpsc::Sender<Event>) {
        let start = Instant::now();

        if let Err(e) = file.load_content().await {
            let _ = events.send(Event::Error(e.to_string())).await;
            return;
        }

        let per_file_txn = self.txn_mode == TransactionMode::PerFile;

        if per_file_txn {
            if let Err(e) = self.client.batch_execute("BEGIN").await {
                let _ = events.send(Event::Error(e.to_string())).await;
                return;
            }
        }

        if let Err(e) = self.apply(&file).await {
            if per_file_txn {
                let _ = self.client.batch_execute("ROLLBACK").await;
            }
            error!(file = %file.file_name, "migration failed: {e}");
            let _ = events.send(Event::Error(e.to_string())).await;
            return;
        }

        let next_version = match file.direction {
            crate::direction::Direction::Up => file.version,
            crate::direction::Direction::Down => file.version.saturating_sub(1),
        };

        if let Err(e) = self.set_version(next_version).await {
            if per_file_txn {
                let _ = self.client.batch_execute("ROLLBACK").await;
            }
            let _ = events.send(Event::Error(e.to_string())).await;
            return;
        }

        if per_file_txn {
            if let Err(e) = self.client.batch_execute("COMMIT").await {
                let _ = events.send(Event::Error(e.to_string())).await;
                return;
            }
        }

        info!(
            file = %file.file_name,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "migration applied"
        );
    }

    async fn version(&mut self) -> Result<Version, Error> {
        self.current_version().await
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.connection.abort();
        Ok(())
    }

    fn supports_single_transaction(&self) -> bool {
        true
    }

    async fn begin_single(&mut self) -> Result<(), Error> {
        self.client.batch_execute("BEGIN").await?;
        self.in_single_transaction = true;
        Ok(())
    }

    async fn commit_single(&mut self) -> Result<(), Error> {
        if self.in_single_transaction {
            self.client.batch_execute("COMMIT").await?;
            self.in_single_transaction = false;
        }
        Ok(())
    }

    async fn rollback_single(&mut self) -> Result<(), Error> {
        if self.in_single_transaction {
            self.client.batch_execute("ROLLBACK").await?;
            self.in_single_transaction = false;
        }
        Ok(())
    }
}
