mod commands;
mod content;
mod gateway;
mod motivation;
mod progress;
mod scheduler;

use clap::{Parser, Subcommand};
use hydro_channels::TelegramChannel;
use hydro_core::{
    config::{self, Config},
    schedule::generate_slots,
    shellexpand,
    traits::Channel,
};
use hydro_memory::Store;
use motivation::MotivationManager;
use scheduler::ReminderScheduler;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "hydro",
    version,
    about = "💧 Hydro: water-intake reminders over Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot and the reminder scheduler.
    Start,
    /// Show configuration and store health.
    Status,
    /// Print the reminder times for the configured work window.
    Schedule,
}

/// Console plus daily-rolling file logging. The guard must outlive `main`'s work.
fn init_logging(cfg: &Config) -> anyhow::Result<WorkerGuard> {
    let logs_dir = PathBuf::from(shellexpand(&cfg.hydro.data_dir)).join("logs");
    std::fs::create_dir_all(&logs_dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&logs_dir, "hydro.log"));

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.hydro.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg)?;
    cfg.validate()?;

    match cli.command {
        Commands::Start => {
            let Some(tg) = cfg.channel.telegram.clone().filter(|tg| tg.enabled) else {
                anyhow::bail!(
                    "Telegram is not enabled. Configure [channel.telegram] in {} \
                     or set TELEGRAM_BOT_TOKEN.",
                    cli.config
                );
            };
            if tg.bot_token.is_empty() {
                anyhow::bail!(
                    "Telegram is enabled but bot_token is empty. \
                     Set it in config.toml or TELEGRAM_BOT_TOKEN env var."
                );
            }
            let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(tg)?);

            let store = Store::new(&cfg.memory).await?;

            let dispatcher = Arc::new(gateway::ChannelDispatcher::new(
                channel.clone(),
                store.clone(),
                MotivationManager::new(store.clone(), cfg.reminders.clone()),
                cfg.reminders.clone(),
            ));
            let scheduler = Arc::new(ReminderScheduler::new(
                store.clone(),
                dispatcher,
                cfg.reminders.clone(),
                cfg.scheduler.clone(),
            ));

            println!("💧 {} starting...", cfg.hydro.name);
            let gw = Arc::new(gateway::Gateway::new(
                channel,
                store,
                scheduler,
                cfg.reminders.clone(),
                cfg.scheduler.enabled,
            ));
            gw.run().await?;
        }
        Commands::Status => {
            println!("💧 {} status\n", cfg.hydro.name);
            println!("Config: {}", cli.config);
            println!("Data dir: {}", shellexpand(&cfg.hydro.data_dir));
            println!(
                "Daily goal: {} ml, {} ml per reminder",
                cfg.reminders.daily_goal_ml, cfg.reminders.water_per_session_ml
            );
            println!(
                "Scheduler: {} (poll every {}s)",
                if cfg.scheduler.enabled {
                    "enabled"
                } else {
                    "disabled"
                },
                cfg.scheduler.poll_interval_secs
            );
            println!();

            match cfg.channel.telegram {
                Some(ref tg) => println!(
                    "  telegram: {}",
                    if tg.enabled && !tg.bot_token.is_empty() {
                        "configured"
                    } else if tg.enabled {
                        "enabled but missing bot_token"
                    } else {
                        "disabled"
                    }
                ),
                None => println!("  telegram: not configured"),
            }

            let store = Store::new(&cfg.memory).await?;
            println!("  users: {}", store.count_users().await?);
            println!("  database: {} KiB", store.db_size().await? / 1024);
        }
        Commands::Schedule => {
            let r = &cfg.reminders;
            let slots = generate_slots(r.work_start_hour, r.work_end_hour, r.interval_minutes)?;
            println!(
                "Reminders {:02}:00-{:02}:00, every {} min ({} per day):",
                r.work_start_hour,
                r.work_end_hour,
                r.interval_minutes,
                slots.len()
            );
            for (i, slot) in slots.iter().enumerate() {
                let kind = if i == 0 { "morning" } else { "regular" };
                println!("  {}  {kind}", slot.format("%H:%M"));
            }
        }
    }

    Ok(())
}
