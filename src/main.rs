use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use depthwire::core::Config;
use depthwire::orderbook::SharedBook;
use depthwire::session::MarketSession;
use depthwire::sink::LogSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("DEPTHWIRE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&PathBuf::from(&config_path))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.app.log_level.clone())),
        )
        .init();
    tracing::info!("🦀 DepthWire starting ({} markets)", config.markets.len());

    let sink = Arc::new(LogSink);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut books = Vec::new();
    let mut tasks = Vec::new();
    for entry in &config.markets {
        let market = match entry.to_market() {
            Ok(market) => market,
            Err(e) => {
                // Fatal for this market only; its siblings keep running.
                tracing::error!(error = %e, "skipping malformed market");
                continue;
            }
        };

        let book = SharedBook::new();
        books.push((market.tag(), book.clone()));

        let session = MarketSession::new(market, book, sink.clone());
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = session.run(shutdown).await {
                tracing::error!(error = %e, "market stopped with error");
            }
        }));
    }

    if tasks.is_empty() {
        anyhow::bail!("no valid markets configured in {config_path}");
    }

    // Top-of-book monitor: one log line per market per interval.
    if config.app.bbo_log_secs > 0 {
        let interval = Duration::from_secs(config.app.bbo_log_secs);
        let mut shutdown = shutdown_rx.clone();
        let books = books.clone();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for (tag, book) in &books {
                            if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
                                tracing::info!(
                                    "[OB {}] bid={} ask={} spread={}",
                                    tag,
                                    bid.price,
                                    ask.price,
                                    ask.price - bid.price
                                );
                            }
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        }));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}
