//! TUI application state and event loop.
//!
//! The app owns nothing but handles: ingestion and decay run on their own
//! threads and the app only reads registry snapshots at the refresh cadence.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use netheat_core::{HeatEntry, HeatRegistry, IngestStats};

use super::ui::{self, LayoutConfig};

pub struct App {
    registry: Arc<HeatRegistry>,
    stats: Arc<IngestStats>,
    shutdown: Arc<AtomicBool>,
    source_name: String,
    refresh: Duration,
    layout: LayoutConfig,
    export_dir: PathBuf,
    last_export: Option<PathBuf>,
}

impl App {
    pub fn new(
        registry: Arc<HeatRegistry>,
        stats: Arc<IngestStats>,
        shutdown: Arc<AtomicBool>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            stats,
            shutdown,
            source_name: source_name.into(),
            refresh: netheat_core::config::REFRESH_INTERVAL,
            layout: LayoutConfig::default(),
            export_dir: PathBuf::from("."),
            last_export: None,
        }
    }

    pub fn refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh.max(Duration::from_millis(1));
        self
    }

    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Directory `s` writes snapshots into.
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(t) => t,
            Err(e) => {
                restore_terminal();
                return Err(e);
            }
        };

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_terminal();
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        release_terminal(terminal.backend_mut(), disable_raw_mode)?;

        if let Some(path) = self.last_export() {
            println!("Last snapshot saved to {}", path.display());
        }

        result
    }

    fn run_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        while self.is_running() {
            terminal.draw(|f| ui::draw(f, self))?;

            // Resize events need no handling; the next draw picks up the new size.
            if event::poll(self.refresh)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit(),
            KeyCode::Char('s') => match self.export_snapshot() {
                Ok(path) => {
                    log::info!("snapshot written to {}", path.display());
                    self.last_export = Some(path);
                }
                Err(e) => log::warn!("snapshot export failed: {e}"),
            },
            _ => {}
        }
    }

    fn quit(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Write the ranked heat table and ingest counters as JSON.
    pub fn export_snapshot(&self) -> io::Result<PathBuf> {
        let epoch = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let entries = ui::rank(&self.snapshot(), usize::MAX);
        let json = serde_json::json!({
            "source": self.source_name,
            "captured_at": epoch,
            "max_heat": self.registry.cap(),
            "packets": self.stats.packets(),
            "skipped": self.stats.skipped(),
            "bytes": self.stats.bytes(),
            "entries": entries,
        });

        let path = self
            .export_dir
            .join(format!("netheat-snapshot-{epoch}.json"));
        let contents = serde_json::to_string_pretty(&json).map_err(io::Error::other)?;
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn snapshot(&self) -> Vec<HeatEntry> {
        self.registry.snapshot()
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::SeqCst)
    }

    pub fn last_export(&self) -> Option<&Path> {
        self.last_export.as_deref()
    }
}

fn restore_terminal() {
    let _ = release_terminal(&mut io::stdout(), disable_raw_mode);
}

/// Leave raw mode and the alternate screen. Both steps always run; the first
/// failure is returned.
fn release_terminal<W: io::Write>(
    out: &mut W,
    disable_raw: impl FnOnce() -> io::Result<()>,
) -> io::Result<()> {
    let raw = disable_raw();
    let screen = execute!(out, LeaveAlternateScreen, crossterm::cursor::Show);
    raw.and(screen)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
