//! The MySQL driver. Always behaves like `TransactionMode::None`: MySQL's
//! DDL statements implicitly commit, so wrapping them in `START
//! TRANSACTION` buys nothing and [`Driver::supports_single_transaction`]
//! stays `false`.
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts};
use tokio::sync::mpsc;
use tracing::error;

use super::statement::split_statements;
use super::Driver;
use crate::direction::{Direction, Version};
use crate::error::Error;
use crate::event::Event;
use crate::file::File;

const CREATE_BOOKKEEPING_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS schema_migrations (version BIGINT NOT NULL PRIMARY KEY)";

pub struct MysqlDriver {
    conn: Conn,
}

impl MysqlDriver {
    pub async fn initialize(url: &str) -> Result<Self, Error> {
        let opts = Opts::from_url(url).map_err(|e| Error::DriverInit(e.to_string()))?;
        let mut conn = Conn::new(opts).await.map_err(|e| Error::DriverInit(e.to_string()))?;
        conn.query_drop(CREATE_BOOKKEEPING_TABLE)
            .await
            .map_err(|e| Error::DriverInit(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Driver for MysqlDriver {
    fn filename_extension(&self) -> &'static str {
        "sql"
    }

    async fn migrate(&mut self, mut file: File, events: mpsc::Sender<Event>) {
        if let Err(e) = file.load_content().await {
            let _ = events.send(Event::Error(e.to_string())).await;
            return;
        }

        let sql = String::from_utf8_lossy(file.content.as_deref().unwrap_or(&[])).into_owned();
        for statement in split_statements(&sql) {
            if let Err(e) = self.conn.query_drop(&statement).await {
                error!(file = %file.file_name, "migration failed: {e}");
                let _ = events
                    .send(Event::Error(
                        Error::MigrationExec {
                            file: file.file_name.clone(),
                            source: e.to_string(),
                        }
                        .to_string(),
                    ))
                    .await;
                return;
            }
        }

        let next_version = match file.direction {
            Direction::Up => file.version,
            Direction::Down => file.version.saturating_sub(1),
        };

        if let Err(e) = self.conn.query_drop("DELETE FROM schema_migrations").await {
            let _ = events.send(Event::Error(e.to_string())).await;
            return;
        }
        if let Err(e) = self
            .conn
            .exec_drop("INSERT INTO schema_migrations (version) VALUES (?)", (next_version,))
            .await
        {
            let _ = events.send(Event::Error(e.to_string())).await;
        }
    }

    async fn version(&mut self) -> Result<Version, Error> {
        let row: Option<i64> = self
            .conn
            .query_first("SELECT version FROM schema_migrations LIMIT 1")
            .await
            .map_err(|e| Error::VersionRecord(e.to_string()))?;
        Ok(row.unwrap_or(0) as Version)
    }

    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
