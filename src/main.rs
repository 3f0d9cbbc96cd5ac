mod gateway;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tbot_channels::telegram::TelegramTransport;
use tbot_commands::CommandClient;
use tbot_core::config;
use tbot_core::traits::{CommandHost, Transport};
use tbot_store::Store;

#[derive(Parser)]
#[command(name = "tbot", version, about = "tbot — long-polling study-group bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Check configuration and store health.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;

            if cfg.telegram.bot_token.is_empty() {
                anyhow::bail!(
                    "Telegram bot_token is empty. \
                     Set it in config.toml or the TELEGRAM_BOT_TOKEN env var."
                );
            }

            let store = Store::new(&cfg.store).await?;
            let transport: Arc<dyn Transport> =
                Arc::new(TelegramTransport::new(cfg.telegram.clone()));
            let commands: Arc<dyn CommandHost> = Arc::new(CommandClient::new(cfg.commands.clone()));

            println!("tbot — starting...");
            let gw = gateway::Gateway::new(&cfg, transport, store, commands)?;
            gw.run().await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("tbot — Status Check\n");
            println!("Config: {}", cli.config);
            println!(
                "  telegram: {}",
                if cfg.telegram.bot_token.is_empty() {
                    "missing bot_token"
                } else {
                    "configured"
                }
            );

            let store = Store::new(&cfg.store).await?;
            let users = store.get_users().await?;
            println!("  store: {} ({} users)", cfg.store.db_path, users.len());
            println!(
                "  schedule reminder: {} ±{}s on {}",
                cfg.broadcast.schedule_time,
                cfg.broadcast.window_tolerance_secs,
                cfg.broadcast.study_days.join(", ")
            );
            println!(
                "  announcements: {} ±{}s",
                cfg.broadcast.announce_time, cfg.broadcast.window_tolerance_secs
            );
        }
    }

    Ok(())
}
