use anyhow::Result;
use clap::Parser;
use nexplorer_cli::{Cli, Command};
use nexplorer_config::{AppPaths, ConfigManager};
use nexplorer_console::{render, ConsoleConfirmer, ConsoleContext, InputLines};
use nexplorer_core::{
    establish, ActionRouter, ActivityLog, Browser, CommandExecutor, EventBus, HttpModelClient,
    ModelClient, PermissionGate, SessionState, TransferQueue,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = AppPaths::new()?;
    let config_manager = ConfigManager::new(paths.clone());
    let config = config_manager.load(
        cli.config.as_deref().map(Path::new),
        std::env::current_dir().ok().as_deref(),
        cli.overrides(),
    )?;
    let _log_guard = init_logging(&config, &paths, config.logging.stdout && !cli.is_interactive())?;
    info!(version = env!("CARGO_PKG_VERSION"), "nexplorer starting");

    if let Some(Command::Config { init }) = &cli.command {
        if *init {
            config_manager.save_default()?;
            println!("config initialized at {}", paths.config_file.display());
        } else {
            println!("{}", paths.config_file.display());
        }
        return Ok(());
    }

    let input = InputLines::spawn_stdin();
    let confirmer = Arc::new(ConsoleConfirmer::new(input.clone()));
    let mut log = ActivityLog::new(config.browser.log_max);
    let connection = match establish(&config, &paths, cli.local, &*confirmer, &mut log).await {
        Ok(connection) => connection,
        Err(err) => {
            let mut shown = 0;
            render::print_new_log(&log, &mut shown)?;
            error!(error = %err, "no usable connection");
            return Err(err.into());
        }
    };
    let executor = Arc::new(CommandExecutor::new(connection.backend.clone()));

    match cli.command {
        Some(Command::Ls { path }) => {
            let path = path.unwrap_or_else(|| connection.start_path.clone());
            for entry in executor.list(&path).await {
                println!("{}", entry.to_line());
            }
            executor.backend().close().await?;
        }
        Some(Command::Search { query, base }) => {
            let base = base.unwrap_or_else(|| connection.start_path.clone());
            println!("{}", executor.search(&query, &base).await?);
            executor.backend().close().await?;
        }
        _ => {
            let (bus, events) = EventBus::new(64);
            let queue = TransferQueue::new(
                executor.clone(),
                bus.clone(),
                config.transfer.queue_capacity,
            );
            let model: Arc<dyn ModelClient> = Arc::new(HttpModelClient::new(config.ai.clone())?);
            let router = ActionRouter::new(
                Browser::new(executor, config.browser.preview_lines),
                PermissionGate::new(confirmer),
            );
            let state = SessionState::new(
                connection.mode,
                connection.home,
                connection.start_path,
                connection.overview,
                log,
            );
            nexplorer_console::run(ConsoleContext {
                router,
                state,
                model,
                queue,
                bus,
                events,
                input,
            })
            .await?;
        }
    }

    Ok(())
}

fn init_logging(
    config: &nexplorer_config::AppConfig,
    paths: &AppPaths,
    enable_stdout: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(&paths.log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&paths.log_dir, "nexplorer.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let file_layer = if config.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed()
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if enable_stdout {
        let stdout_layer = if config.logging.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };
        tracing::subscriber::set_global_default(subscriber.with(stdout_layer))?;
    } else {
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(guard)
}
