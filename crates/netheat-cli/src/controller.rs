//! Process lifecycle: open the source, start the workers, run the chart,
//! shut down.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use netheat_core::sources::SourceSpec;
use netheat_core::{DecayScheduler, HeatConfig, HeatRegistry, IngestStats, spawn_ingest};

use crate::tui::app::App;
use crate::tui::ui::LayoutConfig;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot open packet source: {0}")]
    Source(#[from] netheat_core::Error),

    #[error("cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("cannot start {worker} thread: {source}")]
    Spawn {
        worker: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),
}

/// Everything the controller needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: SourceSpec,
    pub heat: HeatConfig,
    pub layout: LayoutConfig,
    pub refresh: Duration,
}

/// Counters reported once the chart closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub packets: u64,
    pub skipped: u64,
    pub bytes: u64,
    pub addresses: usize,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "netheat stopped: {} packets ({} bytes) from {} addresses, {} frames skipped",
            self.packets, self.bytes, self.addresses, self.skipped
        )
    }
}

/// Run until the user quits or a termination signal arrives.
pub fn run(settings: Settings) -> Result<Summary, Error> {
    let source = settings.source.open()?;
    let source_name = source.name().to_string();

    let registry = Arc::new(HeatRegistry::with_config(&settings.heat));
    let stats = Arc::new(IngestStats::new());
    let shutdown = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    // Not joined on exit: a capture may sit in recv until its timeout and a
    // stdin replay can block indefinitely.
    spawn_ingest(
        source,
        Arc::clone(&registry),
        Arc::clone(&shutdown),
        Arc::clone(&stats),
    )
    .map_err(|source| Error::Spawn {
        worker: "ingest",
        source,
    })?;

    let decay = DecayScheduler::from_config(Arc::clone(&registry), &settings.heat)
        .spawn(Arc::clone(&shutdown))
        .map_err(|source| {
            shutdown.store(true, Ordering::SeqCst);
            Error::Spawn {
                worker: "decay",
                source,
            }
        })?;

    log::info!("charting {source_name}");
    let mut app = App::new(
        Arc::clone(&registry),
        Arc::clone(&stats),
        Arc::clone(&shutdown),
        source_name,
    )
    .refresh(settings.refresh)
    .layout(settings.layout);
    let result = app.run();

    shutdown.store(true, Ordering::SeqCst);
    if decay.join().is_err() {
        log::warn!("decay thread panicked");
    }
    result.map_err(Error::Terminal)?;

    Ok(Summary {
        packets: stats.packets(),
        skipped: stats.skipped(),
        bytes: stats.bytes(),
        addresses: registry.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
