mod config_commands;
mod store;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    stickler_config::{StickerConfig, data_dir, discover_and_load},
    stickler_discord::{DiscordPlatform, bot},
    stickler_sticky::StickyService,
    stickler_updates::{UpdateChecker, format_status_line, format_update_notice},
};

#[derive(Parser)]
#[command(name = "stickler", version, about = "Stickler: sticky messages for Discord")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "STICKLER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Print the stored sticky messages.
    List,
    /// Check the registry for a newer release.
    CheckUpdates,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[cfg(feature = "metrics")]
fn init_metrics(config: &StickerConfig) -> anyhow::Result<()> {
    stickler_metrics::init_metrics(stickler_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen: config.metrics.listen.clone(),
        global_labels: vec![("service".into(), "stickler".into())],
    })?;
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn init_metrics(config: &StickerConfig) -> anyhow::Result<()> {
    if config.metrics.enabled {
        warn!("metrics requested but stickler was built without the metrics feature");
    }
    Ok(())
}

async fn log_update_check(config: &StickerConfig) {
    if !config.update_check.enabled {
        return;
    }
    let check = UpdateChecker::new(&config.update_check, env!("CARGO_PKG_VERSION"))
        .check_for_updates()
        .await;
    match format_update_notice(&check) {
        Some(notice) => warn!("{notice}"),
        None => info!("{}", format_status_line(&check)),
    }
}

async fn run_bot(config: StickerConfig) -> anyhow::Result<()> {
    if !config.discord.has_token() {
        anyhow::bail!(
            "no Discord bot token configured; set discord.token or {}",
            stickler_config::TOKEN_ENV_VAR
        );
    }

    init_metrics(&config)?;

    let update_config = config.clone();
    let update_task = tokio::spawn(async move { log_update_check(&update_config).await });

    let store = store::open_store(&config.storage, &data_dir()).await?;
    let http = bot::http_client(&config.discord.token)?;
    let platform = Arc::new(DiscordPlatform::new(http));
    let service = StickyService::new(store, platform, &config.sticky);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
        }
        ctrl_c.cancel();
    });

    service.start().await;
    let result = bot::run(&config.discord.token, Arc::clone(&service), cancel.clone()).await;
    cancel.cancel();
    service.stop().await;
    update_task.abort();

    result.context("discord client stopped with an error")
}

async fn list_stickies(config: &StickerConfig) -> anyhow::Result<()> {
    let store = store::open_store(&config.storage, &data_dir()).await?;
    let mut records = store.list_all().await?;
    if records.is_empty() {
        println!("No sticky messages are configured.");
        return Ok(());
    }
    records.sort_by(|a, b| {
        a.created_at_ms
            .cmp(&b.created_at_ms)
            .then_with(|| a.channel_id.cmp(&b.channel_id))
    });
    for record in &records {
        let via = if record.use_webhook {
            "webhook"
        } else {
            "direct"
        };
        let first_line = record.message.lines().next().unwrap_or_default();
        println!(
            "  {}  [{via}, {} msgs, artifact {}]  {first_line}",
            record.channel_id,
            record.msg_count,
            record.artifact_id.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn check_updates(config: &StickerConfig) -> anyhow::Result<()> {
    let check = UpdateChecker::new(&config.update_check, env!("CARGO_PKG_VERSION"))
        .check_for_updates()
        .await;
    println!("{}", format_status_line(&check));
    if let Some(notice) = format_update_notice(&check) {
        println!("\n{notice}");
    }
    if !check.success {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    if let Some(Commands::Config { action }) = cli.command {
        return config_commands::handle_config(action, cli.config.as_deref());
    }

    let config = discover_and_load(cli.config.as_deref())?;

    match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "stickler starting");
            run_bot(config).await
        },
        Some(Commands::List) => list_stickies(&config).await,
        Some(Commands::CheckUpdates) => check_updates(&config).await,
        Some(Commands::Config { .. }) => Ok(()),
    }
}
