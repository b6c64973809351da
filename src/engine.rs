//! Engine facade.
//!
//! [`EngineFacade`] wires the pieces together: ticks from the
//! [`TickIngestor`] (or [`EngineFacade::ingest`]) are appended to the
//! [`PriceHistoryStore`], indicators are recomputed over the updated
//! history, classified into a [`Signal`], and published as one immutable
//! [`InstrumentSnapshot`]. Readers either pull the latest snapshot per
//! instrument or subscribe to the update stream.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::EngineConfig;
use crate::history::{Appended, PriceHistoryStore};
use crate::indicators::{IndicatorSnapshot, Macd, Trend};
use crate::models::PriceTick;
use crate::signal::{Signal, SignalInputs, classify};
use crate::websocket::{
    ConnectionState, Connector, IngestorHandle, TickIngestor, TickSink, WsConnector,
};

/// Everything published for one instrument after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentSnapshot {
    pub instrument: String,
    pub price: f64,
    pub change_24h: f64,
    pub change_7d: f64,
    pub volume_24h: f64,
    pub best_bid: f64,
    pub best_ask: f64,
    /// Bid/ask spread in percent of the bid.
    pub spread: f64,
    pub rsi: f64,
    pub macd: Macd,
    pub trend: Trend,
    pub signal: Signal,
    pub updated_at: DateTime<Utc>,
}

/// Latest snapshot of an instrument and the history append it came from.
struct Published {
    sequence: u64,
    snapshot: Arc<InstrumentSnapshot>,
}

/// Shared state behind the facade; also the ingestor's tick sink.
struct EngineCore {
    history: PriceHistoryStore,
    weekly_open: DashMap<String, f64>,
    snapshots: DashMap<String, Published>,
    updates: broadcast::Sender<Arc<InstrumentSnapshot>>,
}

impl EngineCore {
    fn process(&self, tick: PriceTick) -> Arc<InstrumentSnapshot> {
        let instrument = tick.instrument();
        let Appended { sequence, prices } = self.history.append(instrument, tick.price());

        let indicators = IndicatorSnapshot::compute(&prices);
        let change_24h = tick.change_24h();
        let change_7d = self.change_7d(instrument, tick.price());
        let signal = classify(&SignalInputs::new(&indicators, change_24h, change_7d));

        debug!(
            instrument,
            history = prices.len(),
            rsi = indicators.rsi,
            macd = indicators.macd.macd,
            trend = indicators.trend.direction.as_str(),
            signal = signal.label.as_str(),
            "Recomputed indicators"
        );

        let snapshot = Arc::new(InstrumentSnapshot {
            instrument: instrument.to_string(),
            price: tick.price(),
            change_24h,
            change_7d,
            volume_24h: tick.volume_24h(),
            best_bid: tick.bid(),
            best_ask: tick.ask(),
            spread: tick.spread_pct(),
            rsi: indicators.rsi,
            macd: indicators.macd,
            trend: indicators.trend,
            signal,
            updated_at: tick.received_at(),
        });

        // A single Arc swap: readers see either the old or the new pair. A
        // snapshot computed from an older append never replaces a newer one.
        let published = Published {
            sequence,
            snapshot: Arc::clone(&snapshot),
        };
        match self.snapshots.entry(snapshot.instrument.clone()) {
            Entry::Occupied(mut latest) => {
                if latest.get().sequence < sequence {
                    latest.insert(published);
                } else {
                    debug!(instrument, sequence, "Snapshot superseded before publication");
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(published);
            }
        }
        // No receivers is fine.
        let _ = self.updates.send(Arc::clone(&snapshot));

        snapshot
    }

    fn change_7d(&self, instrument: &str, price: f64) -> f64 {
        match self.weekly_open.get(instrument).map(|open| *open) {
            Some(open) if open > 0.0 => (price - open) / open * 100.0,
            _ => 0.0,
        }
    }
}

impl TickSink for EngineCore {
    fn on_tick(&self, tick: PriceTick) {
        self.process(tick);
    }
}

pub struct EngineFacade {
    config: EngineConfig,
    core: Arc<EngineCore>,
    ingestor: Option<IngestorHandle>,
}

impl EngineFacade {
    /// Creates a stopped engine.
    ///
    /// # Errors
    ///
    /// Returns [`TickwiseError::Config`](crate::TickwiseError::Config) if
    /// the configuration fails validation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let (updates, _) = broadcast::channel(config.update_buffer);

        let core = Arc::new(EngineCore {
            history: PriceHistoryStore::new(config.history_capacity),
            weekly_open: DashMap::new(),
            snapshots: DashMap::new(),
            updates,
        });

        Ok(Self {
            config,
            core,
            ingestor: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts ingesting from the configured WebSocket feed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.start_with(WsConnector);
    }

    /// Starts ingesting through a custom [`Connector`]. Does nothing if
    /// the engine is already running.
    pub fn start_with<C: Connector>(&mut self, connector: C) {
        if self.ingestor.is_some() {
            warn!("Engine already started");
            return;
        }

        let sink: Arc<dyn TickSink> = self.core.clone();
        let ingestor = TickIngestor::new(&self.config, connector, sink);
        self.ingestor = Some(ingestor.spawn());
        info!(
            instruments = ?self.config.instruments,
            "Engine started"
        );
    }

    /// Stops ingestion. Published snapshots and histories are kept.
    pub async fn stop(&mut self) {
        if let Some(mut ingestor) = self.ingestor.take() {
            ingestor.stop().await;
            info!("Engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ingestor.is_some()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ingestor
            .as_ref()
            .map_or(ConnectionState::Disconnected, IngestorHandle::state)
    }

    /// Connection state receiver while the engine is running.
    pub fn watch_connection(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.ingestor.as_ref().map(IngestorHandle::watch_state)
    }

    /// Runs one tick through the pipeline and returns what was published.
    pub fn ingest(&self, tick: PriceTick) -> Arc<InstrumentSnapshot> {
        self.core.process(tick)
    }

    /// Latest snapshot for an instrument.
    pub fn snapshot(&self, instrument: &str) -> Option<Arc<InstrumentSnapshot>> {
        self.core
            .snapshots
            .get(instrument)
            .map(|entry| Arc::clone(&entry.snapshot))
    }

    /// Latest snapshot of every instrument, ordered by instrument id.
    pub fn snapshots(&self) -> Vec<Arc<InstrumentSnapshot>> {
        let mut all: Vec<_> = self
            .core
            .snapshots
            .iter()
            .map(|entry| Arc::clone(&entry.snapshot))
            .collect();
        all.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        all
    }

    /// Stream of every published snapshot. Slow receivers lose the oldest
    /// updates rather than holding up ingestion.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<InstrumentSnapshot>> {
        self.core.updates.subscribe()
    }

    /// Current price history of an instrument, oldest first.
    pub fn history(&self, instrument: &str) -> Vec<f64> {
        self.core.history.get(instrument)
    }

    /// Records the price from seven days ago, used for the 7d change.
    /// Non-finite or non-positive prices are ignored.
    pub fn set_weekly_open(&self, instrument: &str, price: f64) {
        if !price.is_finite() || price <= 0.0 {
            warn!(instrument, price, "Ignoring invalid weekly open");
            return;
        }
        self.core.weekly_open.insert(instrument.to_string(), price);
    }

    /// Overall market mood in `[0, 100]` from the average 24h change of
    /// every published instrument; 50 when nothing is published yet.
    pub fn market_sentiment(&self) -> f64 {
        let changes: Vec<f64> = self
            .core
            .snapshots
            .iter()
            .map(|entry| entry.snapshot.change_24h)
            .collect();
        if changes.is_empty() {
            return 50.0;
        }

        let average = changes.iter().sum::<f64>() / changes.len() as f64;
        (50.0 + average * 2.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::TrendDirection;
    use crate::signal::SignalLabel;

    fn engine() -> EngineFacade {
        EngineFacade::new(EngineConfig::new(
            "wss://feed.invalid",
            vec!["BTC-USD".to_string()],
        ))
        .unwrap()
    }

    fn tick(instrument: &str, price: f64) -> PriceTick {
        PriceTick::new(instrument, price, Utc::now()).unwrap()
    }

    #[test]
    fn first_tick_is_neutral() {
        let engine = engine();
        let snapshot = engine.ingest(tick("BTC-USD", 43_000.0));

        assert_eq!(snapshot.rsi, 50.0);
        assert_eq!(snapshot.macd, Macd::default());
        assert_eq!(snapshot.trend.direction, TrendDirection::Neutral);
        assert_eq!(snapshot.signal.label, SignalLabel::Hold);
        assert_eq!(engine.history("BTC-USD"), vec![43_000.0]);
    }

    #[test]
    fn snapshot_reflects_latest_tick() {
        let engine = engine();
        engine.ingest(tick("BTC-USD", 100.0));
        engine.ingest(tick("BTC-USD", 101.0));

        let latest = engine.snapshot("BTC-USD").unwrap();
        assert_eq!(latest.price, 101.0);
        assert!(engine.snapshot("ETH-USD").is_none());
    }

    #[test]
    fn history_is_bounded_by_capacity() {
        let engine = engine();
        for i in 1..=60 {
            engine.ingest(tick("BTC-USD", f64::from(i)));
        }
        let history = engine.history("BTC-USD");
        assert_eq!(history.len(), 50);
        assert_eq!(history.first(), Some(&11.0));
    }

    #[test]
    fn rally_with_momentum_is_strong_buy() {
        let engine = engine();
        engine.set_weekly_open("BTC-USD", 80.0);
        let mut last = None;
        for i in 0..30 {
            let t = tick("BTC-USD", 100.0 + f64::from(i)).with_open_24h(Some(100.0));
            last = Some(engine.ingest(t));
        }

        let snapshot = last.unwrap();
        // MACD, trend and momentum vote bullish; RSI is overbought.
        assert_eq!(snapshot.rsi, 100.0);
        assert_eq!(snapshot.trend.direction, TrendDirection::Bullish);
        assert!(snapshot.change_24h > 3.0);
        assert!(snapshot.change_7d > 5.0);
        assert_eq!(snapshot.signal.label, SignalLabel::StrongBuy);
        assert_eq!(snapshot.signal.timeframe, "1D");
    }

    #[test]
    fn concurrent_ingest_keeps_snapshot_in_step_with_history() {
        let engine = engine();
        for _round in 0..20 {
            std::thread::scope(|scope| {
                for worker in 0..4 {
                    let engine = &engine;
                    scope.spawn(move || {
                        for i in 1..=200 {
                            engine.ingest(tick("BTC-USD", f64::from(worker * 1_000 + i)));
                        }
                    });
                }
            });

            let history = engine.history("BTC-USD");
            let latest = engine.snapshot("BTC-USD").unwrap();
            assert_eq!(history.last(), Some(&latest.price));
            let expected = IndicatorSnapshot::compute(&history);
            assert_eq!(latest.rsi, expected.rsi);
            assert_eq!(latest.macd, expected.macd);
            assert_eq!(latest.trend, expected.trend);
        }
    }

    #[test]
    fn weekly_open_rejects_invalid_prices() {
        let engine = engine();
        engine.set_weekly_open("BTC-USD", -5.0);
        engine.set_weekly_open("BTC-USD", f64::NAN);
        let snapshot = engine.ingest(tick("BTC-USD", 100.0));
        assert_eq!(snapshot.change_7d, 0.0);
    }

    #[test]
    fn sentiment_tracks_average_change() {
        let engine = engine();
        assert_eq!(engine.market_sentiment(), 50.0);

        engine.ingest(tick("BTC-USD", 110.0).with_open_24h(Some(100.0)));
        engine.ingest(tick("ETH-USD", 100.0).with_open_24h(Some(100.0)));
        // Average change is +5%.
        assert!((engine.market_sentiment() - 60.0).abs() < 1e-9);

        // +10%, 0% and -20%.
        engine.ingest(tick("DOGE-USD", 8.0).with_open_24h(Some(10.0)));
        let expected = 50.0 - 20.0 / 3.0;
        assert!((engine.market_sentiment() - expected).abs() < 1e-9);

        engine.ingest(tick("ETH-USD", 10.0).with_open_24h(Some(100.0)));
        assert_eq!(engine.market_sentiment(), 0.0);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let engine = engine();
        let snapshot = engine.ingest(
            tick("BTC-USD", 100.0)
                .with_open_24h(Some(95.0))
                .with_quote(Some(99.5), Some(100.5)),
        );

        let value = serde_json::to_value(snapshot.as_ref()).unwrap();
        assert_eq!(value["instrument"], "BTC-USD");
        assert!(value.get("change24h").is_some());
        assert!(value.get("updatedAt").is_some());
        assert_eq!(value["bestBid"], 99.5);
        assert_eq!(value["macd"]["histogram"], 0.0);
        assert_eq!(value["trend"]["direction"], "NEUTRAL");
        assert_eq!(value["signal"]["label"], "HOLD");
    }

    #[test]
    fn not_running_until_started() {
        let engine = engine();
        assert!(!engine.is_running());
        assert_eq!(engine.connection_state(), ConnectionState::Disconnected);
        assert!(engine.watch_connection().is_none());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig::new("wss://feed.invalid", Vec::new());
        assert!(EngineFacade::new(config).is_err());
    }
}
