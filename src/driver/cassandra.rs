//! The wide-column driver. Cassandra/ScyllaDB has no general-purpose
//! transactions, so this driver always behaves like
//! `TransactionMode::None` regardless of what the caller asked for, and
//! never wraps anything in a batch beyond what a single statement needs.
use std::sync::Arc;

use async_trait::async_trait;
use scylla::Session;
use tokio::sync::mpsc;
use tracing::error;

use super::statement::split_statements;
use super::Driver;
use crate::direction::{Direction, Version};
use crate::error::Error;
use crate::event::Event;
use crate::file::File;

const KEYSPACE_AND_TABLE: &str = "drifter_schema_migrations";
const CREATE_BOOKKEEPING_TABLE: &str = "CREATE TABLE IF NOT EXISTS drifter_schema_migrations \
     (id int PRIMARY KEY, version bigint)";

pub struct CassandraDriver {
    session: Arc<Session>,
}

impl CassandraDriver {
    pub async fn initialize(url: &str) -> Result<Self, Error> {
        let node = url
            .strip_prefix("cassandra://")
            .ok_or_else(|| Error::DriverInit(format!("not a cassandra url: {url}")))?;

        let session = scylla::SessionBuilder::new()
            .known_node(node)
            .build()
            .await
            .map_err(|e| Error::Cassandra(e.to_string()))?;

        session
            .query_unpaged(CREATE_BOOKKEEPING_TABLE, &[])
            .await
            .map_err(|e| Error::Cassandra(e.to_string()))?;

        Ok(Self {
            session: Arc::new(session),
        })
    }
}

#[async_trait]
impl Driver for CassandraDriver {
    fn filename_extension(&self) -> &'static str {
        "cql"
    }

    async fn migrate(&mut self, mut file: File, events: mpsc::Sender<Event>) {
        if let Err(e) = file.load_content().await {
            let _ = events.send(Event::Error(e.to_string())).await;
            return;
        }

        let cql = String::from_utf8_lossy(file.content.as_deref().unwrap_or(&[])).into_owned();
        for statement in split_statements(&cql) {
            if let Err(e) = self.session.query_unpaged(statement.as_str(), &[]).await {
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

        let upsert = format!(
            "INSERT INTO {KEYSPACE_AND_TABLE} (id, version) VALUES (0, {next_version})"
        );
        if let Err(e) = self.session.query_unpaged(upsert, &[]).await {
            let _ = events.send(Event::Error(e.to_string())).await;
        }
    }

    async fn version(&mut self) -> Result<Version, Error> {
        let result = self
            .session
            .query_unpaged(
                format!("SELECT version FROM {KEYSPACE_AND_TABLE} WHERE id = 0"),
                &[],
            )
            .await
            .map_err(|e| Error::VersionRecord(e.to_string()))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| Error::VersionRecord(e.to_string()))?;

        match rows.rows::<(i64,)>().map_err(|e| Error::VersionRecord(e.to_string()))?.next() {
            Some(Ok((version,))) => Ok(version as Version),
            _ => Ok(0),
        }
    }

    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

