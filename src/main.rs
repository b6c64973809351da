use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tickwise::config::fetch_config;
use tickwise::{EngineFacade, TickwiseError};

#[tokio::main]
async fn main() -> Result<(), TickwiseError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = fetch_config()?;
    let mut engine = EngineFacade::new(config)?;
    let mut updates = engine.subscribe();

    engine.start();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(snapshot) => info!(
                    instrument = %snapshot.instrument,
                    price = snapshot.price,
                    change_24h = snapshot.change_24h,
                    rsi = snapshot.rsi,
                    trend = snapshot.trend.direction.as_str(),
                    signal = snapshot.signal.label.as_str(),
                    strength = snapshot.signal.strength,
                    confidence = snapshot.signal.confidence,
                    "Snapshot"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Snapshot logger fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    engine.stop().await;
    info!(sentiment = engine.market_sentiment(), "Final market sentiment");

    Ok(())
}
