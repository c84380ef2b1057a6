// SPDX-License-Identifier: GPL-3.0-only

use camcaps::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camcaps")]
#[command(about = "Discover capture device formats and negotiate resolution/frame rate")]
#[command(version = camcaps::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Configuration file (default: ~/.config/camcaps/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Format query tool to run instead of v4l2-ctl
    #[arg(long, global = true)]
    tool: Option<String>,

    /// Format query timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Command pipe of the rendering server
    #[arg(long, global = true)]
    pipe: Option<PathBuf>,

    /// Preference file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List capture devices
    List,

    /// Query and print the formats a device supports
    Probe {
        /// Device path (default: stored input device, else first device)
        #[arg(short, long)]
        device: Option<String>,

        /// Print the capability map as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse saved `v4l2-ctl --list-formats-ext` output
    Parse {
        /// Input file (default: stdin)
        file: Option<PathBuf>,
    },

    /// Negotiate a format for a device and apply it
    Negotiate {
        /// Device path (default: stored input device, else first device)
        #[arg(short, long)]
        device: Option<String>,

        /// Preferred resolution, e.g. 1920x1080
        #[arg(short, long)]
        resolution: Option<String>,

        /// Preferred frame rate
        #[arg(short, long)]
        fps: Option<u32>,

        /// Do not notify the rendering server
        #[arg(long)]
        no_send: bool,
    },

    /// Switch the input device and negotiate for it
    Select {
        /// Device path
        #[arg(short, long)]
        device: String,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load(),
        };

        if let Some(tool) = &self.tool {
            config.tool = tool.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.probe_timeout_ms = timeout_ms;
        }
        if let Some(pipe) = &self.pipe {
            config.command_pipe = pipe.clone();
        }
        if let Some(settings) = &self.settings {
            config.settings_path = Some(settings.clone());
        }

        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camcaps=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command {
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Probe { device, json }) => cli::probe_device(&config, device, json),
        Some(Commands::Parse { file }) => cli::parse_file(&config, file),
        Some(Commands::Negotiate {
            device,
            resolution,
            fps,
            no_send,
        }) => cli::negotiate(&config, device, resolution, fps, no_send),
        Some(Commands::Select { device }) => cli::select_device(&config, &device),
        None => cli::startup(&config),
    }
}
