mod simulate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "visage",
    version,
    about = "Visage — sprite-based talking-head animation engine",
    long_about = "Visage composites streamed base animation frames and time-aligned overlay\nsequences into a smooth, audio-synchronized talking-head video."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted playback session against synthetic agent frames
    Simulate {
        /// Number of logical ticks to run
        #[arg(short, long, default_value_t = 96)]
        ticks: usize,

        /// Output directory for composited PNG frames
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Canvas size as WIDTHxHEIGHT
        #[arg(long, default_value = "320x320")]
        size: String,

        /// Skip writing PNG files; print the run hash only
        #[arg(long)]
        no_frames: bool,

        /// Drive the session runtime on the wall clock instead of stepping
        /// the engine directly (non-deterministic tick timing)
        #[arg(long)]
        realtime: bool,

        /// Logical frames per second in realtime mode
        #[arg(long, default_value_t = 24.0)]
        fps: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    );
    subscriber.init();

    match cli.command {
        Commands::Simulate {
            ticks,
            output,
            size,
            no_frames,
            realtime,
            fps,
        } => {
            let (width, height) = simulate::parse_size(&size)?;
            let options = simulate::SimulateOptions {
                ticks,
                output,
                width,
                height,
                write_frames: !no_frames,
                fps,
            };
            if realtime {
                simulate::run_realtime(options)
            } else {
                simulate::run(options)
            }
        }
    }
}
