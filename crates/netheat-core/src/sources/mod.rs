//! Packet source implementations.

pub mod capture;
pub mod demo;
pub mod replay;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::source::PacketSource;

/// Which packet source to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Live capture on a network interface.
    Capture { interface: String },
    /// `SRC DST BYTES` lines from a file, or stdin for `-`.
    Replay { path: PathBuf },
    /// Synthetic traffic, one packet per `pace`.
    Demo { pace: Duration },
}

impl SourceSpec {
    /// Open the source. Failures here are startup failures.
    pub fn open(&self) -> Result<Box<dyn PacketSource>> {
        match self {
            Self::Capture { interface } => Ok(Box::new(capture::LiveCapture::open(interface)?)),
            Self::Replay { path } => Ok(Box::new(replay::ReplaySource::open(path)?)),
            Self::Demo { pace } => Ok(Box::new(demo::DemoSource::new(*pace))),
        }
    }
}
