use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tabdeck_core::StrategyKind;
use tabdeck_daemon::commands::{Console, HELP};
use tabdeck_daemon::config::{self, TabdeckConfig};
use tabdeck_daemon::file_source::FileSnapshotSource;
use tabdeck_daemon::{
    ChangeEvent, Engine, ItemActions, MoveController, StrategySelector, TextView, ViewSink,
    scheduler, watcher,
};
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "tabdeck-daemon", about = "Live grouped tab dashboard")]
struct Cli {
    /// Config file (default: ~/.config/tabdeck/tabdeck.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Snapshot document to read tabs and windows from
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Annotation map file
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Grouping strategy: window, domain or notes
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Quiet period before a pass runs, in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Run a single pass, print the dashboard and exit
    #[arg(long)]
    once: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };

    let directive: tracing_subscriber::filter::Directive = format!("tabdeck_daemon={level}")
        .parse()
        .unwrap_or_else(|_| tracing::Level::INFO.into());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive)
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("Daemon fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Command-line flags win over the config file.
fn apply_overrides(cfg: &mut TabdeckConfig, cli: &Cli) {
    if let Some(path) = &cli.snapshot {
        cfg.source.snapshot_path = path.display().to_string();
    }
    if let Some(path) = &cli.annotations {
        cfg.source.annotations_path = path.display().to_string();
    }
    if let Some(strategy) = cli.strategy {
        cfg.engine.strategy = strategy;
    }
    if let Some(ms) = cli.debounce_ms {
        cfg.engine.debounce_ms = ms;
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("tabdeck-daemon starting");

    let mut cfg = config::load_config(cli.config.as_deref())?;
    apply_overrides(&mut cfg, &cli);

    let snapshot_file = cfg.source.snapshot_file()?;
    let annotations_file = cfg.source.annotations_file()?;
    info!(
        "Reading tabs from {} (notes: {})",
        snapshot_file.display(),
        annotations_file.display()
    );

    let source = Arc::new(FileSnapshotSource::new(&snapshot_file, &annotations_file));
    let view: Arc<dyn ViewSink> = Arc::new(TextView::stdout(cfg.engine.notice_ttl()));
    let (mut selector, strategy_rx) = StrategySelector::new(cfg.engine.strategy);
    let mut engine = Engine::new(source.clone(), Arc::clone(&view), strategy_rx);

    if cli.once {
        let report = engine.pass().await;
        debug!("Single pass done: {report:?}");
        return Ok(());
    }

    let rendered = engine.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (scheduler, scheduler_task) =
        scheduler::spawn(engine, cfg.engine.timing(), shutdown_rx.clone());
    selector.attach(scheduler.clone());

    // First pass right away; later ones follow changes.
    scheduler.notify();

    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeEvent>();
    let _watcher = if cfg.source.watch {
        Some(
            watcher::start_watcher(&[snapshot_file, annotations_file], tx)
                .context("Failed to watch source files")?,
        )
    } else {
        info!("File watching disabled; use 'refresh' to update");
        None
    };

    let forward_scheduler = scheduler.clone();
    let mut forward_shutdown = shutdown_rx.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        debug!("Change event: {event:?}");
                        forward_scheduler.notify();
                    }
                    None => break,
                },
                _ = forward_shutdown.changed() => break,
            }
        }
    });

    let console = Console {
        selector,
        mover: MoveController::new(source.clone(), rendered.clone(), Arc::clone(&view))
            .with_scheduler(scheduler.clone()),
        actions: ItemActions::new(source.clone(), source, rendered, Arc::clone(&view))
            .with_scheduler(scheduler.clone()),
        scheduler,
        view,
    };
    info!(
        "Annotation shortcut: {}; type 'help' for commands",
        cfg.shortcut.display()
    );
    debug!("{HELP}");

    tokio::select! {
        result = console.run(BufReader::new(tokio::io::stdin())) => {
            if result.context("Failed to read commands")? {
                info!("Quit requested, stopping...");
            } else {
                info!("No more console input; running until signalled");
                wait_for_shutdown().await?;
                info!("Shutdown signal received, stopping...");
            }
        }
        signal = wait_for_shutdown() => {
            signal?;
            info!("Shutdown signal received, stopping...");
        }
    }
    let _ = shutdown_tx.send(true);

    // Wait for tasks to finish
    let engine = scheduler_task.await.context("Scheduler task failed")?;
    let _ = forward_task.await;

    info!(
        "tabdeck-daemon stopped ({} groups displayed)",
        engine.rendered().len()
    );
    Ok(())
}

/// Wait for SIGTERM or SIGINT
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to register SIGTERM")?;
        let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT")?;
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to register Ctrl+C handler")?;
        info!("Received Ctrl+C");
    }
    Ok(())
}
