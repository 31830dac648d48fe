//! CLI for netheat: a live heat chart of who your machine is talking to.

mod controller;
mod tui;

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use netheat_core::HeatConfig;
use netheat_core::config::{DECAY_INTERVAL, DECAY_RATE, DEFAULT_INTERFACE, MAX_BYTES, MAX_HEAT, REFRESH_INTERVAL};
use netheat_core::sources::SourceSpec;

use crate::tui::ui::LayoutConfig;

#[derive(Parser, Debug)]
#[command(name = "netheat")]
#[command(about = "netheat: live per-address traffic heat chart for the terminal")]
#[command(version = netheat_core::VERSION)]
struct Cli {
    /// Network interface to capture from
    #[arg(short, long, default_value = DEFAULT_INTERFACE)]
    interface: String,

    /// Replay `SRC DST BYTES` lines from a file instead of capturing ("-" reads stdin)
    #[arg(long, conflicts_with = "demo")]
    replay: Option<PathBuf>,

    /// Chart synthetic traffic instead of capturing
    #[arg(long)]
    demo: bool,

    /// Microseconds between synthetic packets in --demo mode
    #[arg(long, default_value = "500")]
    demo_pace_us: u64,

    /// Heat at which the green bar is full
    #[arg(long, default_value_t = MAX_BYTES)]
    max_bytes: f64,

    /// Upper clamp for any address's heat
    #[arg(long, default_value_t = MAX_HEAT)]
    max_heat: f64,

    /// Heat removed from every address per decay tick
    #[arg(long, default_value_t = DECAY_RATE)]
    decay_rate: f64,

    /// Milliseconds between decay ticks
    #[arg(long, default_value_t = DECAY_INTERVAL.as_millis() as u64)]
    decay_interval_ms: u64,

    /// Milliseconds between redraws
    #[arg(long, default_value_t = REFRESH_INTERVAL.as_millis() as u64)]
    refresh_ms: u64,

    /// Forget addresses that stayed at zero heat for this many decay ticks
    #[arg(long)]
    evict_after: Option<u32>,

    /// Write logs to this file (the chart owns the terminal)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn source(&self) -> SourceSpec {
        if let Some(path) = &self.replay {
            SourceSpec::Replay { path: path.clone() }
        } else if self.demo {
            SourceSpec::Demo {
                pace: Duration::from_micros(self.demo_pace_us),
            }
        } else {
            SourceSpec::Capture {
                interface: self.interface.clone(),
            }
        }
    }

    fn settings(&self) -> controller::Settings {
        controller::Settings {
            source: self.source(),
            heat: HeatConfig {
                max_heat: self.max_heat,
                decay_rate: self.decay_rate,
                decay_interval: Duration::from_millis(self.decay_interval_ms),
                evict_after: self.evict_after,
            },
            layout: LayoutConfig {
                max_bytes: self.max_bytes,
                max_heat: self.max_heat,
                ..LayoutConfig::default()
            },
            refresh: Duration::from_millis(self.refresh_ms),
        }
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> std::io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_ref()) {
        eprintln!("Error: cannot open log file: {e}");
        std::process::exit(1);
    }

    match controller::run(cli.settings()) {
        Ok(summary) => println!("{summary}"),
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
