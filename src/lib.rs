//! Streaming technical-indicator and signal engine.
//!
//! Ingests a live per-instrument ticker feed over WebSocket, keeps a bounded
//! rolling price history for each instrument, recomputes RSI, MACD and a
//! simplified Parabolic-SAR trend on every tick, and classifies the result
//! into a discrete trading [`signal::Signal`]. The [`engine::EngineFacade`]
//! publishes an immutable snapshot per instrument for readers.

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod indicators;
pub mod models;
pub mod signal;
pub mod websocket;

pub use engine::{EngineFacade, InstrumentSnapshot};
pub use error::{Result, TickwiseError};
