//! Error types for opening and driving packet sources.

use std::io;
use std::path::PathBuf;

/// Errors raised while setting up a packet source.
///
/// Once a source is running, per-packet problems are never errors: they are
/// reported as [`crate::SourceEvent::Skipped`] and counted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The capture socket could not be created or configured.
    #[error("cannot capture on {interface}: {source}")]
    Capture {
        interface: String,
        #[source]
        source: io::Error,
    },

    /// The named interface does not exist on this machine.
    #[error("no such network interface: {0}")]
    NoSuchInterface(String),

    /// A replay file could not be opened.
    #[error("cannot open replay input {path}: {source}")]
    Replay {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Live capture is only implemented for Linux packet sockets.
    #[error("live capture is not supported on this platform (try --replay or --demo)")]
    Unsupported,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
