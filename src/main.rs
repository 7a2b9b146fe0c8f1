use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use orbit::config::{self, OrbitConfig};
use orbit::core::engine::LoopEngine;
use orbit::core::loop_state::RunState;
use orbit::core::marker::{Marker, sort_markers};
use orbit::core::snapshot::LoopSnapshot;
use orbit::error::Result as OrbitResult;
use orbit::host::Host;
use orbit::notify::{DesktopNotifier, LogNotifier, Notifier};
use orbit::store::{LoopStore, OrgLoopStore};

const LABEL_CHARS: usize = 16;

#[derive(Parser)]
#[command(name = "orbit", version, about = "Loop timer with marker notifications")]
struct Cli {
    /// Log at debug level for this run
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the loop now, or after a delay
    Start {
        /// Minutes to wait before the loop starts
        #[arg(long = "in", value_name = "MINUTES")]
        delay: Option<u32>,
    },
    /// Pause a running loop, keeping its progress
    Pause,
    /// Resume a paused loop where it left off
    Resume,
    /// Stop the loop
    Stop,
    /// Set the cycle length in minutes
    Duration { minutes: u32 },
    /// Manage markers
    Mark {
        #[command(subcommand)]
        command: MarkCommand,
    },
    /// Show where the loop stands
    Status,
    /// Poll the loop and notify markers until interrupted
    Watch,
}

#[derive(Subcommand)]
enum MarkCommand {
    /// Add a marker at an offset in minutes
    Add {
        offset: i64,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Remove markers by id (a unique prefix is enough)
    Rm { id: String },
    /// List markers along the cycle
    List,
}

fn setup_logging(config: &OrbitConfig) {
    // Log to the systemd user journal (`journalctl --user -t orbit -f`).
    // orbit targets at info/debug (per config), everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("orbit") {
                let max = if orbit::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    orbit::set_debug_logging(config.debug_logging);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("orbit".to_string()),
        Err(e) => {
            eprintln!("Journal unavailable, logging disabled: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so orbit debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

/// Load the loop, apply one change, and save it back.
fn update(
    store: &dyn LoopStore,
    apply: impl FnOnce(&mut LoopSnapshot) -> OrbitResult<()>,
) -> OrbitResult<()> {
    let mut snapshot = store.load()?;
    apply(&mut snapshot)?;
    store.save(&snapshot)
}

fn format_minutes(minutes: f64) -> String {
    let total_secs = (minutes * 60.0).floor() as i64;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

fn print_status(store: &dyn LoopStore) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = store.load()?;
    let now = Utc::now();
    let config = &snapshot.config;
    let observation = LoopEngine::observe(now, config);

    println!("Loop: {} min, {}", config.duration_minutes, config.run_state(now));
    match config.run_state(now) {
        RunState::Idle => {}
        RunState::Scheduled => {
            let countdown = observation.countdown_ms.unwrap_or(0) as f64 / 60_000.0;
            println!("Starts in {}", format_minutes(countdown));
        }
        RunState::Running | RunState::Paused => {
            println!(
                "Cycle {} at {} / {}",
                observation.cycle_index + 1,
                format_minutes(observation.position_minutes),
                format_minutes(f64::from(config.duration_minutes)),
            );
        }
    }
    if let Some(next) = LoopEngine::next_marker(now, config, &snapshot.markers) {
        println!(
            "Next: {} in {}",
            next.text,
            format_minutes(next.minutes_until)
        );
    }
    Ok(())
}

fn print_markers(store: &dyn LoopStore) -> Result<(), Box<dyn std::error::Error>> {
    let mut snapshot = store.load()?;
    sort_markers(&mut snapshot.markers);
    if snapshot.markers.is_empty() {
        println!("No markers.");
    }
    for marker in &snapshot.markers {
        let id = marker
            .id
            .map(|id| id.to_string()[..8].to_string())
            .unwrap_or_else(|| "--------".into());
        let offset = marker.effective_offset(snapshot.config.duration_minutes);
        println!("{}  {:>4} min  {}", id, offset, marker.label(LABEL_CHARS));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = OrbitConfig::load(&config::config_path());
    config.debug_logging |= cli.debug;
    setup_logging(&config);

    config.ensure_files()?;
    let store = Arc::new(OrgLoopStore::new(config.loop_path(), config.default_duration_minutes));
    let mut engine = LoopEngine::new();
    let now = Utc::now();

    match cli.command {
        Command::Start { delay: None } => {
            update(store.as_ref(), |s| engine.start(&mut s.config, now))?;
            log::info!("Loop started");
        }
        Command::Start { delay: Some(minutes) } => {
            let at = now + Duration::minutes(i64::from(minutes));
            update(store.as_ref(), |s| engine.schedule(&mut s.config, at, now))?;
            log::info!("Loop scheduled for {}", at.to_rfc3339());
        }
        Command::Pause => {
            update(store.as_ref(), |s| engine.pause(&mut s.config, now))?;
            log::info!("Loop paused");
        }
        Command::Resume => {
            update(store.as_ref(), |s| engine.resume(&mut s.config, now))?;
            log::info!("Loop resumed");
        }
        Command::Stop => {
            update(store.as_ref(), |s| {
                engine.stop(&mut s.config);
                Ok(())
            })?;
            log::info!("Loop stopped");
        }
        Command::Duration { minutes } => {
            update(store.as_ref(), |s| {
                engine.set_duration(&mut s.config, minutes);
                Ok(())
            })?;
            log::info!("Loop duration set to {} min", minutes.max(1));
        }
        Command::Mark { command: MarkCommand::Add { offset, text } } => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                return Err("marker text must not be empty".into());
            }
            update(store.as_ref(), |s| {
                let id = s.add_marker(Marker::new(text, offset));
                println!("Added {}", id);
                Ok(())
            })?;
        }
        Command::Mark { command: MarkCommand::Rm { id } } => {
            if id.trim().is_empty() {
                return Err("marker id must not be empty".into());
            }
            update(store.as_ref(), |s| {
                let removed = s.remove_marker(id.trim())?;
                println!("Removed {:?}", removed.text);
                Ok(())
            })?;
        }
        Command::Mark { command: MarkCommand::List } => print_markers(store.as_ref())?,
        Command::Status => print_status(store.as_ref())?,
        Command::Watch => {
            let notifier: Arc<dyn Notifier> = if config.desktop_notifications {
                Arc::new(DesktopNotifier::default())
            } else {
                Arc::new(LogNotifier)
            };
            let mut host = Host::new(store.clone(), notifier, config.poll_interval());
            host.run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for ctrl-c: {}", e);
                }
            })
            .await;
        }
    }

    Ok(())
}
