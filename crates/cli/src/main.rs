mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mt5gw_brokers_common::SimulatedTerminal;
use mt5gw_brokers_metatrader::MetaTraderTerminal;
use mt5gw_core::TerminalClient;
use mt5gw_gateway::Gateway;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::FileConfig;

#[derive(Parser)]
#[command(name = "mt5gw")]
#[command(about = "Local gateway between a trading dashboard and a MetaTrader 5 terminal")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to a TOML config file
    #[arg(short, long, env = "MT5GW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TerminalKind {
    /// MetaTrader 5 via the socket bridge
    Metatrader,
    /// In-memory paper terminal
    Simulated,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Bind address
        #[arg(short, long, env = "MT5GW_BIND", default_value = "127.0.0.1:5000")]
        bind: String,

        /// Terminal backend
        #[arg(short, long, value_enum, default_value = "metatrader")]
        terminal: TerminalKind,
    },

    /// Print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let file_config = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind, terminal } => {
            let client: Box<dyn TerminalClient> = match terminal {
                TerminalKind::Metatrader => {
                    Box::new(MetaTraderTerminal::new(file_config.metatrader.clone()))
                }
                TerminalKind::Simulated => {
                    tracing::warn!("Using the simulated terminal; no real orders will be sent");
                    Box::new(SimulatedTerminal::default())
                }
            };
            tracing::info!(
                terminal = client.name(),
                tp_offset = %file_config.gateway.take_profit_offset,
                "Starting gateway"
            );
            let gateway = Gateway::new(client, file_config.gateway);
            mt5gw_api::start_server(gateway, &bind).await?;
        }
        Commands::CheckConfig => {
            print!("{}", toml::to_string_pretty(&file_config)?);
        }
    }

    Ok(())
}
