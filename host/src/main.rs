mod config;
mod constants;
mod engine;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use scene_engine::{load_document, EventSink, HostBridge, LogEventSink, Scheduler, TreeBuilder};

use config::RuntimeConfig;
use constants::{channels, paths};
use error::HostError;

#[derive(Parser)]
#[command(name = "orbital")]
#[command(about = "Run an Orbital system document", long_about = None)]
struct Cli {
    /// System document (JSON)
    system: PathBuf,

    /// Runtime config, defaults to orbital.json next to the document
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks instead of running until Ctrl-C
    #[arg(long)]
    ticks: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Orbital starting...");

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), HostError> {
    let config_path = cli
        .config
        .unwrap_or_else(|| cli.system.with_file_name(paths::CONFIG_FILE));
    let config = RuntimeConfig::load(&config_path).await?;
    let spec = load_document(&cli.system).await?;

    // The engine must answer the handshake before anything is built.
    let (bridge, endpoint) = HostBridge::channel(channels::BRIDGE_QUEUE, config.bridge_timeout());
    let engine = engine::spawn(endpoint);
    let bridge = Arc::new(bridge);
    bridge
        .wait_ready(config.ready_attempts, config.ready_backoff())
        .await?;

    let events: Arc<dyn EventSink> = Arc::new(LogEventSink);
    let mut tree = TreeBuilder::new(Arc::new(scene_nodes::builtin_registry()?))
        .with_broker_config(config.broker_config())
        .with_event_sink(events.clone())
        .with_bridge(bridge.clone())
        .build(&spec)?;
    log::info!(
        "Built {:?}: {} nodes, {} routes",
        cli.system,
        tree.nodes().len(),
        tree.broker().routes().len()
    );

    let scheduler = Scheduler::new(config.tick_interval()).with_event_sink(events);
    tokio::select! {
        _ = scheduler.run(&mut tree, cli.ticks) => {}
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
    }

    let ticks = tree.ticks();
    let dropped = tree.broker().dropped();
    tree.teardown();
    drop(bridge);

    let stats = engine.await?;
    log::info!(
        "Stopped after {} ticks ({} messages dropped, {} entities created)",
        ticks,
        dropped,
        stats.created.len()
    );
    Ok(())
}
