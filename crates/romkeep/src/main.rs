//! romkeep - game session keeper for handheld retro consoles
//!
//! This is the main entry point for every romkeep process. The subcommand
//! selects the mode:
//! - `run`: resume recovered sessions and supervise the foreground game
//! - `list`, `add`, `remove`, `favorite`, `completed`: library management
//! - `play`: launch one game and wait for it
//! - `account`: playtime accounting, started by the launch script

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use romkeep_api::{ActivityQuery, FilterMode, FilterState, SortKey, SystemFilter, WaitOutcome};
use romkeep_config::{Config, load_config_or_default};
use romkeep_core::{Library, RomEntity, run_accounting};
use romkeep_host_api::{NoCombo, ProcessHost, SwitchCombo};
use romkeep_host_linux::{GamepadCombo, LinuxHost};
use romkeep_store::RomRepository;
use romkeep_util::{RomFile, default_config_path, parse_timestamp};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MIN_TICK: Duration = Duration::from_millis(1);

/// romkeep - keeps several games alive at once and tracks playtime
#[derive(Parser, Debug)]
#[command(name = "romkeep")]
#[command(about = "Game session keeper: suspend, resume and track playtime", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path (default: ~/.config/romkeep/config.toml)
    #[arg(short, long, env = "ROMKEEP_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set ROMKEEP_DATA_DIR env var)
    #[arg(short, long, env = "ROMKEEP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resume the sessions left from last time and supervise them (default)
    Run,

    /// Print the activity list
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Sort key: name, time, count or last
        #[arg(long, default_value = "last")]
        sort: SortKey,

        /// Invert the sort order
        #[arg(long)]
        reverse: bool,

        /// Only this system
        #[arg(long)]
        system: Option<String>,

        /// Filter on running: all, match or unmatch
        #[arg(long, default_value = "all")]
        running: FilterMode,

        /// Filter on favorite: all, match or unmatch
        #[arg(long, default_value = "all")]
        favorite: FilterMode,

        /// Filter on completed: all, match or unmatch
        #[arg(long, default_value = "all")]
        completed: FilterMode,
    },

    /// Add games to the library
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove games from the library, terminating their sessions
    Remove {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Toggle the favorite flag of a game
    Favorite { file: PathBuf },

    /// Toggle the completed flag of a game
    Completed { file: PathBuf },

    /// Launch a game and wait for it to exit
    Play { file: PathBuf },

    /// Measure the playtime of a running game (used by launch scripts)
    Account { file: PathBuf, pid: i32 },
}

fn load(args: &Args) -> Result<Config> {
    let mut config = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    if let Some(data_dir) = &args.data_dir {
        config = config.with_data_dir(data_dir.clone());
    }

    info!(
        config_path = %args.config.display(),
        data_dir = %config.data_dir().display(),
        systems = config.systems.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn open_library(config: Config) -> Library {
    let repo = RomRepository::open(config.db_path());
    let host: Arc<dyn ProcessHost> = Arc::new(LinuxHost::new());
    Library::new(config, repo, host)
}

fn open_combo(config: &Config) -> Box<dyn SwitchCombo> {
    if !config.input.gamepad {
        info!("Gamepad input disabled, switch combo disabled");
        return Box::new(NoCombo);
    }
    match GamepadCombo::open(&config.input.combo) {
        Ok(combo) => {
            info!(buttons = ?config.input.combo, "Switch combo enabled");
            Box::new(combo)
        }
        Err(e) => {
            warn!(error = %e, "Failed to open gamepad input, switch combo disabled");
            Box::new(NoCombo)
        }
    }
}

fn rom_file(path: &Path) -> Result<RomFile> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path {:?}", path))?;
    Ok(RomFile::new(absolute.to_string_lossy().into_owned()))
}

/// Supervise the foreground session until every session has ended or a
/// shutdown signal arrives. Sessions still alive at shutdown stay in the
/// recovery file.
async fn run(mut library: Library) -> Result<()> {
    let mut combo = open_combo(library.config());
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    match library.auto_resume().await {
        Some(file) => info!(file = %file, "Resumed foreground session"),
        None => info!("No sessions to resume"),
    }

    let mut tick = tokio::time::interval(library.config().session.wait_poll.max(MIN_TICK));
    info!("Supervisor running");

    loop {
        if library.foreground().is_none() && library.sessions().live_files().is_empty() {
            info!("No live sessions left");
            break;
        }

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = tick.tick() => {
                library.refresh_if_changed();

                let current = library.foreground().cloned();
                match library.poll_foreground(combo.as_mut()) {
                    None => {
                        if current.is_none() {
                            library.switch_next(None);
                        }
                    }
                    Some(WaitOutcome::SwitchRequested) => {
                        library.switch_next(current.as_ref());
                    }
                    Some(outcome) => {
                        report_outcome(current.as_ref(), outcome);
                        library.switch_next(None);
                    }
                }
            }
        }
    }

    let remaining = library.sessions().active_files().len();
    info!(remaining, "Shutdown complete");
    Ok(())
}

/// Launch one game and block until it ends
async fn play(mut library: Library, file: RomFile) -> Result<()> {
    library
        .start(&file)
        .with_context(|| format!("Failed to start {}", file))?;

    let mut tick = tokio::time::interval(library.config().session.wait_poll.max(MIN_TICK));
    loop {
        tick.tick().await;
        if let Some(outcome) = library.poll_foreground(&mut NoCombo) {
            report_outcome(Some(&file), outcome);
            if outcome == WaitOutcome::LaunchFailed {
                bail!("Launcher could not start the emulator for {}", file);
            }
            return Ok(());
        }
        if library.foreground().is_none() {
            return Ok(());
        }
    }
}

fn report_outcome(file: Option<&RomFile>, outcome: WaitOutcome) {
    let file = file.map(|f| f.to_string()).unwrap_or_default();
    match outcome {
        WaitOutcome::Exited { code } => info!(file = %file, code, "Game exited"),
        WaitOutcome::Killed { signal } => {
            warn!(file = %file, signal, "Game was killed, it will be resumed next start")
        }
        WaitOutcome::LaunchFailed => warn!(file = %file, "Launcher failed to execute the emulator"),
        WaitOutcome::SwitchRequested => info!(file = %file, "Switch requested"),
    }
}

fn print_table(entities: &[RomEntity]) {
    for entity in entities {
        let mut flags = String::new();
        if entity.is_running() {
            flags.push('R');
        }
        if entity.favorite.is_true() {
            flags.push('F');
        }
        if entity.completed.is_true() {
            flags.push('C');
        }
        println!(
            "{:<3} {:<8} {:<40} {:>12} {:>5}  {}",
            flags,
            entity.system,
            entity.name,
            entity.total_time,
            entity.count,
            display_last(&entity.last)
        );
    }
}

fn display_last(last: &str) -> String {
    if last.is_empty() {
        return "never".to_string();
    }
    match parse_timestamp(last) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => last.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for command output
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "romkeep starting");

    let config = load(&args)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(open_library(config)).await,

        Command::List {
            json,
            sort,
            reverse,
            system,
            running,
            favorite,
            completed,
        } => {
            let library = open_library(config);
            let query = ActivityQuery {
                filters: FilterState {
                    running,
                    favorite,
                    completed,
                },
                sort,
                reverse,
                system: SystemFilter::from(system),
            };
            let view = library.view(&query);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_table(&view);
            }
            Ok(())
        }

        Command::Add { files } => {
            let mut library = open_library(config);
            for path in files {
                let file = rom_file(&path)?;
                let entity = library.add(file);
                info!(file = %entity.file, name = %entity.name, "Added");
            }
            Ok(())
        }

        Command::Remove { files } => {
            let mut library = open_library(config);
            for path in files {
                let file = rom_file(&path)?;
                if !library.delete(&file) {
                    warn!(file = %file, "Not in the library");
                }
            }
            Ok(())
        }

        Command::Favorite { file } => {
            let mut library = open_library(config);
            let file = rom_file(&file)?;
            let Some(value) = library.toggle_favorite(&file) else {
                bail!("{} is not in the library", file);
            };
            println!("{}: favorite = {}", file, value.is_true());
            Ok(())
        }

        Command::Completed { file } => {
            let mut library = open_library(config);
            let file = rom_file(&file)?;
            let Some(value) = library.toggle_completed(&file) else {
                bail!("{} is not in the library", file);
            };
            println!("{}: completed = {}", file, value.is_true());
            Ok(())
        }

        Command::Play { file } => {
            let file = rom_file(&file)?;
            play(open_library(config), file).await
        }

        Command::Account { file, pid } => {
            let file = rom_file(&file)?;
            let repo = RomRepository::open(config.db_path());
            let host: Arc<dyn ProcessHost> = Arc::new(LinuxHost::new());
            let elapsed =
                run_accounting(host, repo, file, pid, config.accounting.poll_interval).await;
            info!(elapsed_secs = elapsed, "Session recorded");
            Ok(())
        }
    }
}
