mod args;

use std::error::Error;
use std::sync::mpsc;

use clap::Parser;
use ingest::{CycleOutcome, SchedulerTick};
use serde::Serialize;
use serde_json::json;
use streamstat_app::{
    AppPaths, AppState, ensure_app_data_dir, load_dotenv, load_or_create, parse_range,
    resolve_data_dir,
};

use crate::args::{CliArgs, Command};

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,streamstat=info,ingest=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn tick_json(tick: &SchedulerTick) -> serde_json::Value {
    match tick {
        SchedulerTick::Cycle(CycleOutcome::Completed(stats)) => {
            json!({ "status": "completed", "stats": stats })
        }
        SchedulerTick::Cycle(CycleOutcome::Failed {
            stage,
            error,
            stats,
        }) => json!({
            "status": "failed",
            "stage": stage,
            "error": error.to_string(),
            "stats": stats,
        }),
        SchedulerTick::Skipped(error) => {
            json!({ "status": "skipped", "error": error.to_string() })
        }
    }
}

fn build_state(args: &CliArgs) -> Result<AppState, Box<dyn Error>> {
    let data_dir = resolve_data_dir(args.data_dir.clone())?;
    let mut paths = AppPaths::new(data_dir.dir.clone());
    if let Some(config_path) = args.config.clone() {
        paths = paths.with_config_path(config_path);
    }

    let loaded = load_or_create(&paths.config_path)?;
    if loaded.created {
        println!("Created config at {}.", loaded.path.display());
    }
    let mut config = loaded.config;
    config.apply_env()?;

    let paths = paths.apply_config(&config);
    ensure_app_data_dir(&paths)?;
    if data_dir.matched_existing {
        tracing::info!(dir = %data_dir.dir.display(), "using existing data dir");
    } else {
        tracing::info!(dir = %data_dir.dir.display(), "using data dir");
    }

    let app_state = AppState::new(paths, config)?;
    app_state
        .setup_db()
        .map_err(|err| format!("failed to initialize database: {}", err))?;
    Ok(app_state)
}

async fn run_scheduler(app_state: AppState) -> Result<(), Box<dyn Error>> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let ingest = app_state.services.ingest.clone();
    let worker = tokio::task::spawn_blocking(move || ingest.run(&shutdown_rx));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received; stopping after the current cycle");
        }
        let _ = shutdown_tx.send(());
    });

    worker.await??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    load_dotenv();
    init_tracing();

    let app_state = build_state(&args)?;
    match args.command.unwrap_or_default() {
        Command::Run => {
            println!(
                "Polling every {} min. Press Ctrl+C to stop.",
                app_state.config.engine.interval_minutes
            );
            run_scheduler(app_state).await?;
        }
        Command::Once => {
            let ingest = app_state.services.ingest.clone();
            let tick = tokio::task::spawn_blocking(move || ingest.run_once()).await??;
            print_json(&tick_json(&tick))?;
        }
        Command::Stats { login, range } => {
            let range = parse_range(range.as_deref())?;
            let report = app_state
                .services
                .stats
                .channel_report(&login, range, app_state.now())?;
            print_json(&report)?;
        }
        Command::Top { range, limit } => {
            let range = parse_range(range.as_deref())?;
            let top = app_state
                .services
                .stats
                .top_channels(range, app_state.now(), limit)?;
            print_json(&top)?;
        }
        Command::Spans { login, limit } => {
            let spans = app_state.services.stats.recent_spans(&login, limit)?;
            print_json(&spans)?;
        }
        Command::Prune => {
            let pruned = app_state.services.maintenance.prune(app_state.now())?;
            print_json(&pruned)?;
        }
    }
    Ok(())
}
