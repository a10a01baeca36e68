//! ibtopo - InfiniBand fabric discovery
//!
//! Collects port GUIDs from every host, asks `sharp_cmd` for the fabric topology and
//! groups the hosts into torsets, one host list file per torset.

mod artifacts;
mod commands;
mod config;
mod discovery;
mod hosts;
mod output;
mod sharp;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{AnalyzeArgs, DiscoverArgs};
use crate::output::OutputHandler;

/// ibtopo - InfiniBand topology and torset grouping
#[derive(Parser)]
#[command(name = "ibtopo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover InfiniBand fabric topology and group hosts into torsets")]
#[command(long_about = r#"
ibtopo queries every host for its InfiniBand port GUIDs, runs `sharp_cmd topology`
over them and groups the hosts by the top-of-rack switch enclosure they hang off.

Examples:
  ibtopo discover hosts.txt --sharp-cmd /opt/mellanox/sharp/bin/sharp_cmd
  ibtopo discover hosts.txt -u azureuser -k ~/.ssh/id_rsa -o out
  ibtopo analyze --topology out/topology.txt --guid-map out/guid_hosts.json
  ibtopo config --set sharp.ucx_interface=mlx5_ib0:1
"#)]
struct Cli {
    /// Configuration file (defaults to ~/.ibtopo/config.toml)
    #[arg(long, env = "IBTOPO_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect GUIDs over ssh, generate the topology and group hosts into torsets
    Discover(DiscoverArgs),

    /// Group hosts from a saved topology file and GUID map
    Analyze(AnalyzeArgs),

    /// Configuration management
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set a configuration value (key=value)
        #[arg(long)]
        set: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("ibtopo={},ibtopo_cli={},warn", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_deref();
    let config = config::Config::load(config_path)?;
    let output = OutputHandler::new(cli.quiet);

    let result = match cli.command {
        Commands::Discover(args) => commands::discover(&config, &args, &output).await,
        Commands::Analyze(args) => commands::analyze(&config, &args, &output).await,
        Commands::Config { show, set } => {
            if show {
                commands::show_config(&config, config_path, &output)
            } else if let Some(kv) = set {
                commands::set_config(config_path, &kv, &output)
            } else {
                commands::show_config(&config, config_path, &output)
            }
        }
    };

    if let Err(e) = result {
        output.print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
