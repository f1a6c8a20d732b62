//! A schema migration engine: discovers ordered up/down migration
//! scripts on disk, plans a move between versions, and applies that
//! plan through a pluggable backend driver.
//!
//! ```no_run
//! use drifter::{Executor, PlanRequest, TransactionMode};
//!
//! # async fn run() -> Result<(), drifter::Error> {
//! let mut events = Executor::run(
//!     "postgres://localhost/app".to_string(),
//!     "./migrations",
//!     PlanRequest::Up,
//!     TransactionMode::PerFile,
//! );
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```
mod create;
mod direction;
mod driver;
mod error;
mod event;
mod executor;
mod file;
mod parser;
mod plan;

pub use create::{create, CreatedMigration};
pub use direction::{Direction, Version};
pub use driver::{Driver, TransactionMode};
pub use error::Error;
pub use event::Event;
pub use executor::Executor;
pub use file::{File, MigrationFile, MigrationFileSet};
pub use plan::{plan, PlanRequest};

pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
