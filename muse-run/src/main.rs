//! Muse run player (muse-run) - Main entry point
//!
//! Plays a music folder directory by directory, announcing tracks between
//! them, until the folder is exhausted, the requested number of tracks has
//! played, or Ctrl+C / SIGTERM cancels the run.

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use muse_common::config::{ConfigResolver, LibraryFolderResolver, LoggingConfig};
use muse_run::collaborators::{Collaborators, TransientDir, Voice};
use muse_run::local::{Announcer, CommandVoice, ConsoleUi, DirectorySequencer, LogVoice, ProcessPlayer};
use muse_run::{Run, RunConfig};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for muse-run
#[derive(Parser, Debug)]
#[command(name = "muse-run")]
#[command(about = "Plays a music folder with spoken commentary between tracks")]
#[command(version)]
struct Args {
    /// Music folder to play (default: MUSE_LIBRARY, config file, ~/Music)
    library: Option<PathBuf>,

    /// Config file (default: MUSE_CONFIG, ~/.config/muse/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of tracks to play (-1 for all)
    #[arg(short, long)]
    total: Option<i64>,

    /// Shuffle the order of directories
    #[arg(short, long)]
    shuffle: bool,

    /// Play without commentary
    #[arg(long)]
    no_commentary: bool,

    /// Print UI events to stdout as JSON lines
    #[arg(long)]
    json_events: bool,

    /// End the session after this many minutes (checked between tracks)
    #[arg(long)]
    stop_after: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    init_tracing(&toml_config.logging)?;

    info!(
        "Starting muse-run v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config =
        RunConfig::from_toml(&toml_config).context("Invalid [playback] configuration")?;
    if let Some(total) = args.total {
        config.total = total;
    }
    if args.no_commentary {
        config.commentary_enabled = false;
    }
    config.validate().context("Invalid run configuration")?;

    let library = LibraryFolderResolver::new(args.library.as_deref(), Some(&toml_config)).resolve();
    info!("Library folder: {}", library.display());

    let sequencer = DirectorySequencer::scan(&library, config.total, args.shuffle)
        .context("Failed to scan library folder")?;
    let player = ProcessPlayer::new(config.player_command.clone())
        .context("Failed to initialize player")?;

    let mut announcer = Announcer::new(config.lead_seconds);
    if let Some(minutes) = args.stop_after {
        let at = muse_common::time::now() + chrono::Duration::minutes(i64::from(minutes));
        info!("Session ends at {}", at.to_rfc3339());
        announcer = announcer.with_shutdown_at(at);
    }

    let voice: Arc<dyn Voice> = match &config.voice_command {
        Some(command) => Arc::new(
            CommandVoice::new(command.clone()).context("Failed to initialize voice")?,
        ),
        None => Arc::new(LogVoice),
    };

    let ui = Arc::new(ConsoleUi::new(args.json_events));
    let mut collaborators = Collaborators::new(Arc::new(sequencer), Arc::new(player))
        .with_ui(ui.clone())
        .with_commentator(Arc::new(announcer))
        .with_voice(voice);
    if let Some(dir) = &config.transient_dir {
        collaborators = collaborators.with_cleanup(Arc::new(TransientDir::new(dir)));
    }

    let run = Arc::new(Run::new(config, collaborators).context("Failed to create run")?);

    let mut worker = tokio::task::spawn_blocking({
        let run = Arc::clone(&run);
        move || run.execute()
    });

    let joined = tokio::select! {
        joined = &mut worker => joined,
        _ = shutdown_signal() => {
            run.cancel();
            (&mut worker).await
        }
    };

    let outcome = joined.context("Playback thread panicked")??;
    let status = run.status();
    info!(
        "Session over: {} ({} tracks played)",
        outcome, status.completed
    );
    if ui.shutdown_requested() {
        info!("Shutdown requested by the run");
    }

    Ok(())
}

/// Console logging plus an optional log file
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("muse_run={level},muse_common={level}", level = logging.level).into()
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling run");
        },
        _ = terminate => {
            info!("Received terminate signal, cancelling run");
        },
    }
}
