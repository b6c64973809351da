//! Feed connection lifecycle management.
//!
//! [`TickIngestor`] owns the connection state machine:
//!
//! ```text
//! DISCONNECTED --connect--> CONNECTING --Opened--> CONNECTED
//!      ^                        ^                      |
//!      |                        |               Closed / Errored
//!    stop (any state)      timer elapsed               v
//!                               +------------- RECONNECT_WAIT
//! ```
//!
//! Socket callbacks are modelled as a stream of [`ConnectionEvent`]s that
//! the ingestor consumes in a single loop. Each connection gets its own
//! event channel, which is dropped when the connection is released, so a
//! stale socket can never deliver events into a newer connection. The
//! reconnect delay is fixed; there is at most one live link or one pending
//! reconnect timer at any time.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};
use tungstenite::Message as WsMessage;

use super::handler::forward_text;
use super::subscription::ticker_subscription;
use super::connect;
use crate::config::EngineConfig;
use crate::models::PriceTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectWait,
}

/// Something that happened on the feed socket.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened,
    TickReceived(PriceTick),
    Closed,
    Errored(String),
}

/// Receives every tick accepted while connected.
pub trait TickSink: Send + Sync + 'static {
    fn on_tick(&self, tick: PriceTick);
}

/// An open (or opening) connection as seen by the ingestor.
pub trait Link: Send + 'static {
    /// Queues a text frame for the socket.
    fn send(&mut self, text: String);

    /// Closes the socket. No events are delivered once this resolves.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens connections, reporting their lifecycle on `events`.
pub trait Connector: Send + 'static {
    type Link: Link;

    fn open(&self, url: &str, events: mpsc::UnboundedSender<ConnectionEvent>) -> Self::Link;
}

/// Commands sent from the [`IngestorHandle`] to the ingestor loop.
enum IngestorCommand {
    Stop,
}

enum Step {
    Stop,
    Event(ConnectionEvent),
    Reconnect,
}

/// Drives one feed connection for a fixed set of instruments.
pub struct TickIngestor<C: Connector> {
    url: String,
    instruments: Vec<String>,
    reconnect_delay: Duration,
    connector: C,
    sink: Arc<dyn TickSink>,
    state: watch::Sender<ConnectionState>,
    link: Option<C::Link>,
    events: Option<mpsc::UnboundedReceiver<ConnectionEvent>>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl<C: Connector> TickIngestor<C> {
    #[must_use]
    pub fn new(config: &EngineConfig, connector: C, sink: Arc<dyn TickSink>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            url: config.websocket_url.clone(),
            instruments: config.instruments.clone(),
            reconnect_delay: config.reconnect_delay(),
            connector,
            sink,
            state,
            link: None,
            events: None,
            reconnect_timer: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Connects and runs the ingestor on a new task.
    pub fn spawn(self) -> IngestorHandle {
        let (commands, cmd_rx) = mpsc::unbounded_channel();
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run(cmd_rx));

        IngestorHandle {
            commands,
            state,
            task: Some(task),
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<IngestorCommand>) {
        self.connect();

        loop {
            let step = tokio::select! {
                biased;

                cmd = commands.recv() => match cmd {
                    Some(IngestorCommand::Stop) | None => Step::Stop,
                },
                event = next_event(&mut self.events) => Step::Event(event),
                () = timer_elapsed(&mut self.reconnect_timer) => Step::Reconnect,
            };

            match step {
                Step::Stop => {
                    self.stop().await;
                    return;
                }
                Step::Event(event) => self.handle_event(event).await,
                Step::Reconnect => {
                    self.reconnect_timer = None;
                    info!("Reconnect delay elapsed");
                    self.connect();
                }
            }
        }
    }

    fn connect(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        info!(url = %self.url, "Connecting to ticker feed");
        self.link = Some(self.connector.open(&self.url, tx));
        self.events = Some(rx);
        self.set_state(ConnectionState::Connecting);
    }

    async fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                if self.state() != ConnectionState::Connecting {
                    debug!(state = ?self.state(), "Ignoring open outside CONNECTING");
                    return;
                }
                self.set_state(ConnectionState::Connected);
                info!("Ticker feed connected");
                self.send_subscription();
            }
            ConnectionEvent::TickReceived(tick) => {
                if self.state() == ConnectionState::Connected {
                    debug!(instrument = tick.instrument(), price = tick.price(), "Tick");
                    self.sink.on_tick(tick);
                } else {
                    debug!(instrument = tick.instrument(), "Dropping tick received before open");
                }
            }
            ConnectionEvent::Closed => {
                warn!("Ticker feed closed");
                self.schedule_reconnect().await;
            }
            ConnectionEvent::Errored(reason) => {
                warn!(%reason, "Ticker feed failed");
                self.schedule_reconnect().await;
            }
        }
    }

    fn send_subscription(&mut self) {
        let payload = match ticker_subscription(&self.instruments) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to build subscription: {e}");
                return;
            }
        };

        if let Some(link) = self.link.as_mut() {
            link.send(payload);
            info!(instruments = ?self.instruments, "Subscribed to ticker channel");
        }
    }

    async fn schedule_reconnect(&mut self) {
        self.release_connection().await;
        self.reconnect_timer = Some(Box::pin(tokio::time::sleep(self.reconnect_delay)));
        self.set_state(ConnectionState::ReconnectWait);
        info!(
            delay_ms = self.reconnect_delay.as_millis() as u64,
            "Reconnect scheduled"
        );
    }

    /// Drops the event channel and closes the link, if any.
    async fn release_connection(&mut self) {
        self.events = None;
        if let Some(mut link) = self.link.take() {
            link.close().await;
        }
    }

    /// Cancels any pending reconnect and closes any open connection.
    async fn stop(&mut self) {
        self.reconnect_timer = None;
        self.release_connection().await;
        if self.state() != ConnectionState::Disconnected {
            info!("Ticker feed stopped");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "Connection state changed");
        }
    }
}

/// Next event of the current connection; pending while there is none.
/// A sender dropped without a final event counts as a close.
async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<ConnectionEvent>>,
) -> ConnectionEvent {
    match events {
        Some(rx) => rx.recv().await.unwrap_or(ConnectionEvent::Closed),
        None => std::future::pending().await,
    }
}

async fn timer_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Control handle for a spawned [`TickIngestor`].
///
/// Dropping the handle aborts the ingestor task.
pub struct IngestorHandle {
    commands: mpsc::UnboundedSender<IngestorCommand>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl IngestorHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Stops the ingestor and waits until its connection is closed and its
    /// reconnect timer cancelled. Calling it again does nothing.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        let _ = self.commands.send(IngestorCommand::Stop);
        if let Err(e) = task.await {
            warn!("Ingestor task ended abnormally: {e}");
        }
    }
}

impl Drop for IngestorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// [`Connector`] backed by a real WebSocket.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Link = WsLink;

    fn open(&self, url: &str, events: mpsc::UnboundedSender<ConnectionEvent>) -> WsLink {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(url.to_string(), events, outbound_rx));

        WsLink {
            outbound,
            task: Some(task),
        }
    }
}

/// Socket task handle plus its outbound queue.
pub struct WsLink {
    outbound: mpsc::UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl Link for WsLink {
    fn send(&mut self, text: String) {
        if self.outbound.send(text).is_err() {
            debug!("Socket task already finished, dropping outbound frame");
        }
    }

    fn close(&mut self) -> impl Future<Output = ()> + Send {
        let task = self.task.take();
        async move {
            if let Some(task) = task {
                task.abort();
                // Resolves once the task, and with it the socket, is dropped.
                let _ = task.await;
            }
        }
    }
}

impl Drop for WsLink {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Connects, then pumps outbound frames to the socket and inbound frames
/// into `events` until either side ends.
async fn run_socket(
    url: String,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let (mut write, mut read) = match connect(&url).await {
        Ok(pair) => pair,
        Err(e) => {
            error!("Connection failed: {e}");
            let _ = events.send(ConnectionEvent::Errored(e.to_string()));
            return;
        }
    };

    if events.send(ConnectionEvent::Opened).is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(text) = frame else {
                    return;
                };
                if let Err(e) = write.send(WsMessage::Text(text.into())).await {
                    let _ = events.send(ConnectionEvent::Errored(e.to_string()));
                    return;
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        if !forward_text(&text, &events) {
                            return;
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!(?frame, "Server closed the connection");
                        let _ = events.send(ConnectionEvent::Closed);
                        return;
                    }
                    Some(Ok(_)) => {} // Binary/Ping/Pong frames
                    Some(Err(e)) => {
                        let _ = events.send(ConnectionEvent::Errored(e.to_string()));
                        return;
                    }
                    None => {
                        let _ = events.send(ConnectionEvent::Closed);
                        return;
                    }
                }
            }
        }
    }
}
