//! Montage CLI: inspect clip manifests and simulate sequence playback.
//!
//! Usage:
//!   montage inspect <MANIFEST>     Show negotiated durations and bounds
//!   montage overlays <MANIFEST>    Review overlays by screen position
//!   montage simulate <MANIFEST>    Play the sequence on a headless host
//!   montage config                 Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use montage_common::config::{AppConfig, LoggingConfig};
use montage_timeline::OverlayPosition;

mod commands;

#[derive(Parser)]
#[command(
    name = "montage",
    about = "Sequence videos and stills into one continuous presentation",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show clip timing for a manifest
    Inspect {
        /// Path to a JSON clip manifest
        manifest: PathBuf,

        /// Only report the clip playing at this sequence time (seconds)
        #[arg(long)]
        at: Option<f64>,
    },

    /// Review overlays in global time, grouped by position
    Overlays {
        /// Path to a JSON clip manifest
        manifest: PathBuf,

        /// Only report this position
        #[arg(short, long, value_enum)]
        position: Option<PositionArg>,
    },

    /// Play a manifest on a headless host and print transitions
    Simulate {
        /// Path to a JSON clip manifest
        manifest: PathBuf,

        /// Clock time to simulate (seconds)
        #[arg(long, default_value = "30.0")]
        seconds: f64,

        /// Zero-based clip to start from
        #[arg(long)]
        select: Option<usize>,

        /// Fraction of the starting clip to seek to before playing
        #[arg(long)]
        seek: Option<f64>,

        /// Pace frames at wall-clock speed
        #[arg(long)]
        realtime: bool,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PositionArg {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl From<PositionArg> for OverlayPosition {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::TopLeft => OverlayPosition::TopLeft,
            PositionArg::TopRight => OverlayPosition::TopRight,
            PositionArg::BottomLeft => OverlayPosition::BottomLeft,
            PositionArg::BottomRight => OverlayPosition::BottomRight,
            PositionArg::Center => OverlayPosition::Center,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    montage_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });

    match cli.command {
        Commands::Inspect { manifest, at } => commands::inspect::run(manifest, at, &config),
        Commands::Overlays { manifest, position } => {
            commands::overlays::run(manifest, position.map(Into::into), &config)
        }
        Commands::Simulate {
            manifest,
            seconds,
            select,
            seek,
            realtime,
            json,
        } => {
            let options = commands::simulate::SimulateOptions {
                seconds,
                select,
                seek,
                realtime,
                json,
            };
            commands::simulate::run(manifest, options, &config).await
        }
        Commands::Config { init } => commands::config::run(&config, init),
    }
}
