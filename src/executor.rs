//! Ties discovery, planning and a driver together into a single
//! streaming run: connect, compute the plan, execute it file by file,
//! and report progress on a channel as it happens.
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::direction::Version;
use crate::driver::{self, Driver, TransactionMode};
use crate::error::Error;
use crate::event::Event;
use crate::file::MigrationFileSet;
use crate::plan::{plan, PlanRequest};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Runs `request` against the migrations under `path`, connecting to
/// `url` and applying the plan one file at a time.
///
/// Returns immediately with the receiving half of the event channel; the
/// work itself happens on a spawned task. The channel closes when the
/// plan finishes, successfully or not — the last [`Event::Error`], if
/// any, is the caller's signal that the run failed partway through.
pub struct Executor;

impl Executor {
    pub fn run(
        url: String,
        path: impl AsRef<Path> + Send + 'static,
        request: PlanRequest,
        txn_mode: TransactionMode,
    ) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let driver = match driver::connect(&url, txn_mode).await {
                Ok(driver) => driver,
                Err(e) => {
                    let _ = tx.send(Event::Error(e.to_string())).await;
                    return;
                }
            };

            if let Err(e) = execute_plan(driver, path.as_ref(), request, txn_mode, &tx).await {
                let _ = tx.send(Event::Error(e.to_string())).await;
            }
        });

        rx
    }
}

/// Drives a single plan to completion against an already-connected
/// `driver`, streaming progress on `events`.
///
/// Split out from [`Executor::run`] so the plan-execution logic itself
/// — stop-on-first-error, `Single`-mode rollback, per-file version
/// bookkeeping — can be exercised against a test-only [`Driver`] without
/// a real backend connection.
///
/// A failure relayed from the driver's own per-file event stream is
/// *not* re-returned as an `Err` here: the caller already saw it as an
/// [`Event::Error`] on `events`, and re-emitting it would duplicate the
/// same failure on the stream. Only failures that occur before any
/// per-file event has been forwarded (discovery, planning, beginning
/// the plan-wide transaction) are propagated as `Err` so the caller
/// emits exactly one `Event::Error` for them.
async fn execute_plan(
    mut driver: Box<dyn Driver>,
    path: &Path,
    request: PlanRequest,
    txn_mode: TransactionMode,
    events: &mpsc::Sender<Event>,
) -> Result<(), Error> {
    let set = match MigrationFileSet::discover(path, driver.filename_extension()).await {
        Ok(set) => set,
        Err(e) => {
            driver.close().await?;
            return Err(e);
        }
    };

    let current: Version = match driver.version().await {
        Ok(v) => v,
        Err(e) => {
            driver.close().await?;
            return Err(e);
        }
    };

    let files = match plan(&set, current, request) {
        Ok(files) => files,
        Err(e) => {
            driver.close().await?;
            return Err(e);
        }
    };

    if files.is_empty() {
        let _ = events.send(Event::Message("nothing to do".into())).await;
        driver.close().await?;
        return Ok(());
    }

    let single_txn = txn_mode == TransactionMode::Single;
    if single_txn {
        if !driver.supports_single_transaction() {
            driver.close().await?;
            return Err(Error::UnsupportedTransactionMode);
        }
        if let Err(e) = driver.begin_single().await {
            driver.close().await?;
            return Err(e);
        }
    }

    for file in files {
        let (inner_tx, mut inner_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let file_name = file.file_name.clone();

        let _ = events.send(Event::FileStarted(file.clone())).await;
        driver.migrate(file, inner_tx).await;

        let mut failed = false;
        while let Some(event) = inner_rx.recv().await {
            if matches!(event, Event::Error(_)) {
                failed = true;
            }
            let _ = events.send(event).await;
        }

        if failed {
            warn!(file = %file_name, "aborting plan after failure");
            if single_txn {
                let _ = driver.rollback_single().await;
            }
            let _ = driver.close().await;
            // The failing event was already forwarded above; nothing
            // further to report.
            return Ok(());
        }
    }

    if single_txn {
        driver.commit_single().await?;
    }

    info!("plan completed");
    driver.close().await?;
    Ok(())
}
