//! The pass-through driver used for scripted, externally-managed
//! backends: it never tracks a version itself and never executes
//! anything, it only announces each file it would hand off.
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::Driver;
use crate::direction::Version;
use crate::error::Error;
use crate::event::Event;
use crate::file::File;

pub struct ShellDriver {
    extension: &'static str,
}

impl ShellDriver {
    pub async fn initialize(_url: &str) -> Result<Self, Error> {
        Ok(Self { extension: "sh" })
    }
}

#[async_trait]
impl Driver for ShellDriver {
    fn filename_extension(&self) -> &'static str {
        self.extension
    }

    async fn migrate(&mut self, file: File, events: mpsc::Sender<Event>) {
        let _ = events.send(Event::Message(format!("ran {}", file.file_name))).await;
    }

    async fn version(&mut self) -> Result<Version, Error> {
        Ok(0)
    }

    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
