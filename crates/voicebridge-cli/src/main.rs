//! Voice bridge CLI
//!
//! Command-line interface for operating the voice bridge server.

use clap::{Parser, Subcommand};
use voicebridge_server::config::BridgeConfig;

#[derive(Parser)]
#[command(name = "voicebridge")]
#[command(about = "Realtime voice bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the voice bridge server
    Serve,
    /// Resolve configuration from the environment and print it
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => voicebridge_server::run().await?,
        Commands::Config => print_config()?,
    }

    Ok(())
}

fn print_config() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env()?;

    let redacted = serde_json::json!({
        "host": config.host,
        "port": config.port,
        "upstream_api_key": "***redacted***",
        "upstream_model": config.upstream_model,
        "upstream_bootstrap_url": config.upstream_bootstrap_url,
        "upstream_ws_url": config.upstream_ws_url,
        "vad_threshold": config.vad_threshold,
        "silence_duration_ms": config.silence_duration_ms,
        "profit_margin_percent": config.profit_margin_percent,
        "bus_url": config.bus_url,
        "directory_url": config.directory_url,
        "idle_timeout_ms": config.idle_timeout_ms,
        "log_level": config.log_level,
    });

    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}
