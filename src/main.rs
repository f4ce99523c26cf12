use polycopy::config::Config;
use polycopy::datasource::{MarketDataSource, MarketStream, PolymarketDataSource};
use polycopy::engine::BookStore;
use polycopy::orchestration::{run_sweeper, TradeTracker};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting copy-trade simulator");
    tracing::info!("Simulated ratio: {}", config.ratio());

    let store = Arc::new(BookStore::new());
    let source: Arc<dyn MarketDataSource> = Arc::new(PolymarketDataSource::new(
        config.data_api_url.clone(),
        config.clob_api_url.clone(),
    ));

    let (stream, sub_tx) = MarketStream::new(config.ws_url.clone(), store.clone());
    let tracker = TradeTracker::new(config.clone(), source, store.clone(), sub_tx);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let tracker_task = tokio::spawn(tracker.run(shutdown_rx.clone()));
    let stream_task = tokio::spawn(stream.run(shutdown_rx.clone()));
    let sweeper_task = tokio::spawn(run_sweeper(
        store,
        config.book_expiry_ms,
        shutdown_rx,
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);

    let _ = tokio::join!(tracker_task, stream_task, sweeper_task);
}
