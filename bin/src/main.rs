mod cli;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use tally_server::AppState;
use tally_utils::{
    config::Config, Aggregator, AggregatorOptions, RpcSource, SnapshotWriter, TokenRegistry,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info,tally_utils=info,tally_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.cmd {
        Some(Commands::Balances { address }) => balances(&config, &address).await,
        Some(Commands::Serve { .. }) | None => serve(&config).await,
    }
}

async fn serve(config: &Config) -> eyre::Result<()> {
    let source = RpcSource::new(&config.get_rpc()?)?;
    let (writer, writer_handle) = SnapshotWriter::spawn(config.snapshot_path.clone());
    let aggregator = Aggregator::new(source, Arc::new(writer), AggregatorOptions::from(config));
    let state = AppState::new(aggregator, TokenRegistry::new(config));

    let shutdown_signal = CancellationToken::new();
    let ctrl_c_signal = shutdown_signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
        }
        ctrl_c_signal.cancel();
    });

    tally_server::serve(config.port, state, shutdown_signal).await?;

    // the router, and with it the last writer, is gone once serve returns
    writer_handle.await?;
    Ok(())
}

async fn balances(config: &Config, address: &str) -> eyre::Result<()> {
    let source = RpcSource::new(&config.get_rpc()?)?;
    let (writer, writer_handle) = SnapshotWriter::spawn(config.snapshot_path.clone());
    let aggregator = Aggregator::new(source, Arc::new(writer), AggregatorOptions::from(config));

    let registry = TokenRegistry::new(config);
    if let Err(e) = registry.ensure_loaded().await {
        warn!("token list bootstrap failed: {e}");
    }
    let tokens = registry.load_descriptors();

    let snapshot = aggregator.aggregate(address, &tokens).await;
    println!("{}", serde_json::to_string_pretty(&snapshot.balances)?);

    drop(aggregator);
    writer_handle.await?;
    Ok(())
}
