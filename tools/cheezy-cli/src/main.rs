//! Cheezy CLI: capture, upload, and browse shared memories.
//!
//! Usage:
//!   cheezy upload <FILE>            Upload a photo or video
//!   cheezy capture photo|video      Capture with the synthetic camera and upload
//!   cheezy feed [--follow]          Print the shared feed
//!   cheezy browse --swipe <DX>...   Swipe through the card stack
//!   cheezy check                    Check configuration and storage

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cheezy_common::config::{AppConfig, FormFactor};

mod commands;

use commands::{KindArg, LayoutArg};

#[derive(Parser)]
#[command(
    name = "cheezy",
    about = "Capture, share and browse memories",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $CHEEZY_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding blobs and records
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Apply the handheld device policy
    #[arg(long, global = true)]
    handheld: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a photo or video file
    Upload {
        /// File to upload
        file: PathBuf,

        /// Author name
        #[arg(short, long)]
        name: Option<String>,

        /// Caption
        #[arg(short, long)]
        caption: Option<String>,

        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Capture with the synthetic camera and upload the result
    Capture {
        /// What to capture
        #[arg(value_enum)]
        kind: KindArg,

        /// Stop a video after this many seconds (default: Ctrl+C or the cap)
        #[arg(long)]
        stop_after: Option<f64>,

        /// Simulate a declined permission prompt
        #[arg(long)]
        deny_permission: bool,

        /// Reported stream width (0 = not yet known)
        #[arg(long, default_value = "640")]
        width: u32,

        /// Reported stream height (0 = not yet known)
        #[arg(long, default_value = "480")]
        height: u32,

        /// File returned by the native picker under the handheld policy
        #[arg(long)]
        pick: Option<PathBuf>,

        /// Author name
        #[arg(short, long)]
        name: Option<String>,

        /// Caption
        #[arg(short, long)]
        caption: Option<String>,
    },

    /// Print the shared feed
    Feed {
        /// Keep printing as new experiences arrive
        #[arg(long)]
        follow: bool,

        /// Presentation
        #[arg(long, value_enum, default_value = "tile")]
        layout: LayoutArg,

        /// How often to look for appends from other processes (ms)
        #[arg(long, default_value = "1000")]
        poll_ms: u64,
    },

    /// Swipe through the card stack
    Browse {
        /// Horizontal drag distances, applied in order
        #[arg(long = "swipe", num_args = 1.., allow_negative_numbers = true)]
        swipes: Vec<f64>,

        /// Idle auto-advance ticks to apply after the swipes
        #[arg(long, default_value = "0")]
        ticks: u32,
    },

    /// Check configuration and storage
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    if cli.handheld {
        config.device.form_factor = FormFactor::Handheld;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    cheezy_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Upload {
            file,
            name,
            caption,
            mime,
        } => commands::upload::run(&config, file, name, caption, mime).await,
        Commands::Capture {
            kind,
            stop_after,
            deny_permission,
            width,
            height,
            pick,
            name,
            caption,
        } => {
            commands::capture::run(
                &config,
                commands::capture::CaptureArgs {
                    kind: kind.into(),
                    stop_after,
                    deny_permission,
                    width,
                    height,
                    pick,
                    name,
                    caption,
                },
            )
            .await
        }
        Commands::Feed {
            follow,
            layout,
            poll_ms,
        } => commands::feed::run(&config, follow, layout, poll_ms).await,
        Commands::Browse { swipes, ticks } => commands::browse::run(&config, swipes, ticks),
        Commands::Check => commands::check::run(&config, cli.config.as_deref()).await,
    }
}
