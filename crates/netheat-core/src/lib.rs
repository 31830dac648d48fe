//! # netheat-core
//!
//! **Who is your machine talking to, right now?**
//!
//! `netheat-core` keeps a per-address "heat" value that rises with observed
//! traffic and cools down on a timer. It is the engine behind the `netheat`
//! terminal chart.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use netheat_core::{DecayScheduler, HeatRegistry};
//!
//! let registry = Arc::new(HeatRegistry::new(1_000_000.0));
//! registry.record_traffic("10.0.0.1", 1500);
//! registry.record_traffic("10.0.0.2", 600);
//!
//! let decay = DecayScheduler::new(Arc::clone(&registry), 500.0, std::time::Duration::from_millis(500));
//! decay.tick();
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(registry.heat("10.0.0.1"), Some(1000.0));
//! ```
//!
//! ## Architecture
//!
//! Packet source → ingestion → Registry ← decay timer
//!                                 ↓
//!                             snapshot → renderer
//!
//! Every packet source implements the [`PacketSource`] trait. Ingestion turns
//! each packet into two registry updates, one for each end of the flow.

pub mod config;
pub mod decay;
pub mod decode;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod source;
pub mod sources;

pub use config::HeatConfig;
pub use decay::DecayScheduler;
pub use decode::decode_frame;
pub use error::{Error, Result};
pub use ingest::{IngestStats, run_ingest, spawn_ingest};
pub use registry::{HeatEntry, HeatRegistry};
pub use source::{PacketEvent, PacketSource, SkipReason, SourceEvent};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
