//! # Zergling
//!
//! Livestream bot: chat commands, channel-point redemptions, periodic tasks
//! and widget data realms.
//!
//! Usage:
//!   zergling                        # Run with ~/.config/zergling/config.toml
//!   zergling --config bot.toml      # Custom config
//!   zergling --no-console           # Don't read chat from stdin
//!   zergling --restart              # Ask the running instance to exit

mod restart;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use zergling_actions::{Dispatcher, build_registries};
use zergling_channels::{ConsoleReader, ConsoleSink, DiscordNotifier, HelixStreamInfo, HttpLadderSource};
use zergling_core::config::expand_path;
use zergling_core::{ChatSink, ZerglingConfig};
use zergling_scheduler::tasks::{self, dosbox::PsProbe, ladderinfo};
use zergling_scheduler::Scheduler;
use zergling_stream::{EventBus, StreamInterface};

#[derive(Parser)]
#[command(name = "zergling", version, about = "🐛 Zergling: livestream automation bot")]
struct Cli {
    /// Config file (default: ~/.config/zergling/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Directory for realm data files (overrides [stream] data_dir)
    #[arg(long)]
    data_dir: Option<String>,

    /// Don't start the widget gateway
    #[arg(long)]
    no_gateway: bool,

    /// Don't read chat lines from stdin
    #[arg(long)]
    no_console: bool,

    /// Ask the running instance to exit, then quit
    #[arg(long)]
    restart: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "zergling=debug,zergling_core=debug,zergling_stream=debug,zergling_actions=debug,zergling_scheduler=debug,zergling_channels=debug,zergling_gateway=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));
    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config_dir = ZerglingConfig::config_dir();
    if cli.restart {
        let path = restart::request_restart(&config_dir)?;
        println!("🔁 Restart requested: {}", path.display());
        return Ok(());
    }

    let config_path = cli
        .config
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(ZerglingConfig::default_path);
    let mut config = if config_path.exists() {
        ZerglingConfig::load_from(&config_path)?
    } else {
        tracing::warn!("⚠️ No config at {}, using defaults", config_path.display());
        ZerglingConfig::default()
    };
    if let Some(dir) = cli.data_dir {
        config.stream.data_dir = dir;
    }
    if cli.no_gateway {
        config.gateway.enabled = false;
    }

    // A restart file left over from before boot must not stop us right away.
    if restart::take_restart_request(&config_dir).is_some() {
        tracing::debug!("Removed stale restart file");
    }

    let data_path = config.data_dir();
    std::fs::create_dir_all(&data_path)?;
    let config = Arc::new(config);

    let bus = EventBus::new();
    let chat: Arc<dyn ChatSink> = Arc::new(ConsoleSink::stdout());
    let mut stream =
        StreamInterface::new(config.clone(), data_path, chat, bus.clone())?.with_processes(Arc::new(PsProbe));
    if let Some(helix) = HelixStreamInfo::from_config(&config.twitch) {
        stream = stream.with_stream_info(Arc::new(helix))?;
    }
    if let Some(ladder) = HttpLadderSource::from_task_config(&config.task_config(ladderinfo::NAME)) {
        stream = stream.with_ladder(Arc::new(ladder));
    }
    let stream = Arc::new(stream);
    let listeners = stream.init_listeners();
    tracing::info!("📡 {listeners} realm listener(s) running");

    let (commands, redemptions) = build_registries(&config)?;
    let dispatcher = Arc::new(Dispatcher::new(stream.clone(), commands, redemptions));

    let scheduler = Scheduler::from_config(stream.clone());
    let started = scheduler.start(tasks::builtin(&stream))?;

    let (gateway_stop, gateway_stopped) = tokio::sync::oneshot::channel::<()>();
    let gateway = if config.gateway.enabled {
        let gateway_config = config.gateway.clone();
        let bus = bus.clone();
        Some(tokio::spawn(async move {
            let shutdown = async move {
                let _ = gateway_stopped.await;
            };
            if let Err(e) = zergling_gateway::start(&gateway_config, bus, shutdown).await {
                tracing::error!("❌ Widget gateway failed: {e}");
            }
        }))
    } else {
        None
    };

    let console = if cli.no_console {
        None
    } else {
        let reader = ConsoleReader::new(dispatcher.clone(), "local");
        Some(tokio::spawn(async move {
            if let Err(e) = reader.run(BufReader::new(tokio::io::stdin())).await {
                tracing::warn!("⚠️ Console input failed: {e}");
            }
        }))
    };

    if let Some(notifier) = DiscordNotifier::from_config(&config.discord) {
        let body = format!("{started} periodic task(s), {} command(s)", dispatcher.commands().len());
        if let Err(e) = notifier.notify("Zergling started", &body).await {
            tracing::warn!("⚠️ {e}");
        }
    }

    tracing::info!("🐛 Zergling is running");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("🛑 Interrupted"),
        _ = restart::wait_for_restart(config_dir, Duration::from_secs(1)) => {}
    }

    shutdown(scheduler, gateway_stop, gateway, console).await;
    Ok(())
}

async fn shutdown(
    scheduler: Scheduler,
    gateway_stop: tokio::sync::oneshot::Sender<()>,
    gateway: Option<tokio::task::JoinHandle<()>>,
    console: Option<tokio::task::JoinHandle<()>>,
) {
    scheduler.stop();
    scheduler.join().await;

    let _ = gateway_stop.send(());
    if let Some(handle) = gateway {
        if let Err(e) = handle.await {
            tracing::warn!("⚠️ Gateway task ended abnormally: {e}");
        }
    }
    if let Some(handle) = console {
        handle.abort();
    }
    tracing::info!("👋 Zergling stopped");
}
