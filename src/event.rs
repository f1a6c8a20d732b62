//! The event types streamed from the executor and from individual
//! drivers back to the caller.
use crate::file::File;

/// An item on the event stream. The presence of `Error` anywhere in a
/// stream is the sole signal that the plan failed; no further
/// `FileStarted` events are emitted after it within the same plan.
#[derive(Debug, Clone)]
pub enum Event {
    /// A file is about to be (or, for the shell driver, has been)
    /// handed to the backend.
    FileStarted(File),
    /// A human-readable progress message.
    Message(String),
    /// A failure. Carries the backend's message, already formatted.
    Error(String),
}
