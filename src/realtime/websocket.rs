//! WebSocket client for real-time quote push
//!
//! A single supervisor task owns the socket. It connects, runs the session
//! (reader, writer, heartbeat) until the socket closes, then applies the
//! fixed-delay reconnect policy. The subscription set and the listener
//! registry live outside the session and are replayed on every open.
//!
//! Lock order: `supervisor`, then `waiters`, then `outbound`, then `state`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::handlers::{HandlerId, HandlerRegistry};
use super::messages::{InboundMessage, MessageKind, OutboundMessage};
use super::state::{ConnectionState, InternalState};
use crate::common::errors::{ClientError, Result};
use crate::common::traits::{MessageHandler, StreamClient};
use crate::common::types::ConnectionStatus;
use crate::config::types::RealtimeConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const STATUS_CHANNEL_SIZE: usize = 64;

/// Why a session ended
#[derive(Debug)]
enum SessionEnd {
    /// `disconnect` was called
    Shutdown,
    /// Token changed; reconnect immediately without touching the retry budget
    Restart,
    /// Server closed the socket or the stream ended
    Closed(Option<String>),
    /// Read or write failure
    Failed(String),
}

/// Work queued for the open session; dropped with it
#[derive(Debug)]
enum SessionCommand {
    Frame(Message),
    Reconnect,
}

struct Supervisor {
    generation: u64,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Inner {
    config: RealtimeConfig,
    token: RwLock<Option<String>>,
    state: RwLock<InternalState>,
    /// Subscribed ticker codes in first-subscription order
    subscriptions: RwLock<Vec<String>>,
    handlers: HandlerRegistry,
    /// Command queue of the open session
    outbound: Mutex<Option<mpsc::UnboundedSender<SessionCommand>>>,
    supervisor: Mutex<Option<Supervisor>>,
    next_generation: Mutex<u64>,
    /// Callers of `connect` waiting for the next open or failure
    waiters: Mutex<Vec<oneshot::Sender<Result<()>>>>,
    /// Cuts a pending reconnect delay short when `connect` is called
    connect_now: Notify,
    status_tx: broadcast::Sender<ConnectionStatus>,
}

/// Real-time quote client
///
/// Cloning is cheap; clones share the same connection, subscriptions and
/// listeners.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

impl RealtimeClient {
    /// Create a client; nothing connects until [`connect`](Self::connect)
    pub fn new(config: RealtimeConfig) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_SIZE);
        let subscriptions = dedup(config.subscriptions.iter().cloned());
        Self {
            inner: Arc::new(Inner {
                config,
                token: RwLock::new(None),
                state: RwLock::new(InternalState::new()),
                subscriptions: RwLock::new(subscriptions),
                handlers: HandlerRegistry::new(),
                outbound: Mutex::new(None),
                supervisor: Mutex::new(None),
                next_generation: Mutex::new(0),
                waiters: Mutex::new(Vec::new()),
                connect_now: Notify::new(),
                status_tx,
            }),
        }
    }

    /// Set the auth token sent as the `token` query parameter
    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.inner.token.write() = Some(token.into());
        self
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.inner.state.read().state.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.read().state
    }

    /// Consecutive reconnect attempts since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.read().reconnect_attempts
    }

    /// Snapshot of the subscription set
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.subscriptions.read().clone()
    }

    /// Receive connection status changes
    pub fn status_events(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Connect to the push server
    ///
    /// Resolves once the socket is open. When the attempt fails the error is
    /// returned, and the reconnect policy keeps retrying in the background.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<()> {
        let ready_rx = {
            let mut supervisor = self.inner.supervisor.lock();
            let mut waiters = self.inner.waiters.lock();
            // Checked under `waiters`: the session opens and drains under the same lock
            if self.is_connected() {
                return Ok(());
            }

            let (ready_tx, ready_rx) = oneshot::channel();
            waiters.push(ready_tx);
            match supervisor.as_ref() {
                Some(_) => {
                    debug!("Supervisor running, skipping any pending reconnect delay");
                    self.inner.connect_now.notify_waiters();
                }
                None => {
                    // Fresh budget, also after a give-up
                    self.inner.state.write().reset_attempts();
                    *supervisor = Some(self.inner.spawn_supervisor());
                }
            }
            ready_rx
        };

        ready_rx.await.unwrap_or_else(|_| {
            Err(ClientError::WebSocketConnection(
                "connection attempt cancelled".to_string(),
            ))
        })
    }

    /// Add ticker codes to the subscription set
    ///
    /// When connected, a `subscribe` frame with exactly these codes is sent.
    /// Otherwise they are sent with the replay on the next open.
    pub fn subscribe<I, S>(&self, ts_codes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = ts_codes.into_iter().map(Into::into).collect();
        if codes.is_empty() {
            return Ok(());
        }
        {
            let mut subscriptions = self.inner.subscriptions.write();
            for code in &codes {
                if !subscriptions.contains(code) {
                    subscriptions.push(code.clone());
                }
            }
        }
        debug!("Subscribed to {:?}", codes);
        self.send_if_connected(OutboundMessage::Subscribe { ts_codes: codes })
    }

    /// Remove ticker codes from the subscription set
    pub fn unsubscribe<I, S>(&self, ts_codes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = ts_codes.into_iter().map(Into::into).collect();
        if codes.is_empty() {
            return Ok(());
        }
        self.inner
            .subscriptions
            .write()
            .retain(|code| !codes.contains(code));
        debug!("Unsubscribed from {:?}", codes);
        self.send_if_connected(OutboundMessage::Unsubscribe { ts_codes: codes })
    }

    /// Ask the server for one quote; answered by a `stock_price` frame
    pub fn request_price(&self, ts_code: impl Into<String>) -> Result<()> {
        self.send(&OutboundMessage::GetPrice {
            ts_code: ts_code.into(),
        })
    }

    /// Register a listener for one message kind
    pub fn add_message_handler(
        &self,
        kind: MessageKind,
        handler: Arc<dyn MessageHandler>,
    ) -> HandlerId {
        self.inner.handlers.add(kind, handler)
    }

    pub fn remove_message_handler(&self, kind: &MessageKind, id: HandlerId) -> bool {
        self.inner.handlers.remove(kind, id)
    }

    pub fn handler_count(&self, kind: &MessageKind) -> usize {
        self.inner.handlers.handler_count(kind)
    }

    /// Send a frame on the open socket
    ///
    /// Frames are never queued while offline.
    pub fn send(&self, message: &OutboundMessage) -> Result<()> {
        let json = message.to_json()?;
        let outbound = self.inner.outbound.lock();
        match outbound.as_ref() {
            Some(tx) if self.is_connected() => tx
                .send(SessionCommand::Frame(Message::Text(json)))
                .map_err(|_| ClientError::NotConnected),
            _ => {
                warn!("WebSocket not connected, dropping frame: {}", json);
                Err(ClientError::NotConnected)
            }
        }
    }

    fn send_if_connected(&self, message: OutboundMessage) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        match self.send(&message) {
            // Lost the socket between the check and the send; the replay covers it
            Err(ClientError::NotConnected) => Ok(()),
            other => other,
        }
    }

    /// Close the connection, cancel any pending reconnect, and forget all
    /// subscriptions and listeners
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let supervisor = self.inner.supervisor.lock().take();
        if let Some(supervisor) = supervisor {
            let _ = supervisor.shutdown.send(true);
            if let Err(e) = supervisor.handle.await {
                warn!("Supervisor task ended abnormally: {}", e);
            }
        }

        self.inner.state.write().mark_closed();
        *self.inner.outbound.lock() = None;
        self.inner.subscriptions.write().clear();
        self.inner.handlers.clear();
        self.inner.resolve_waiters(|| {
            Err(ClientError::WebSocketConnection(
                "client disconnected".to_string(),
            ))
        });
        self.inner.publish(ConnectionStatus::Disconnected(Some(
            "client disconnect".to_string(),
        )));
        info!("Disconnected from push server");
    }

    /// Replace the auth token
    ///
    /// An open connection is closed and reopened with the new token;
    /// subscriptions and listeners are kept.
    pub fn update_token(&self, token: Option<String>) {
        *self.inner.token.write() = token;
        let outbound = self.inner.outbound.lock();
        // Only a live session holds a queue, so the request dies with it
        if let Some(tx) = outbound.as_ref() {
            if tx.send(SessionCommand::Reconnect).is_ok() {
                info!("Token changed, reconnecting");
            }
        }
    }
}

impl Inner {
    /// Push endpoint with the token query parameter
    fn endpoint(&self) -> Result<Url> {
        let base = self.config.websocket_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/stock/realtime/{}/", base, self.config.room))
            .map_err(|e| ClientError::Configuration(format!("Invalid websocket URL: {}", e)))?;
        if let Some(token) = self.token.read().as_deref() {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    fn publish(&self, status: ConnectionStatus) {
        // No receivers is fine
        let _ = self.status_tx.send(status);
    }

    fn resolve_waiters(&self, outcome: impl Fn() -> Result<()>) {
        for waiter in self.waiters.lock().drain(..) {
            let _ = waiter.send(outcome());
        }
    }

    fn spawn_supervisor(self: &Arc<Self>) -> Supervisor {
        let generation = {
            let mut next = self.next_generation.lock();
            *next += 1;
            *next
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let inner = self.clone();
        let handle = tokio::spawn(async move {
            inner.clone().supervise(generation, shutdown_rx).await;
            inner.retire_supervisor(generation);
        });
        Supervisor {
            generation,
            shutdown: shutdown_tx,
            handle,
        }
    }

    /// Clear the supervisor slot when it still belongs to `generation`
    fn retire_supervisor(&self, generation: u64) {
        let mut supervisor = self.supervisor.lock();
        if supervisor.as_ref().map(|s| s.generation) == Some(generation) {
            *supervisor = None;
            self.resolve_waiters(|| {
                Err(ClientError::WebSocketConnection(
                    "reconnect abandoned".to_string(),
                ))
            });
        }
    }

    /// Stop supervising and fail every pending `connect`
    ///
    /// Without a `fatal` error, a `connect` that arrived after the last attempt
    /// keeps the supervisor alive: the budget is reset and false is returned.
    fn try_abandon(&self, generation: u64, fatal: Option<&str>) -> bool {
        {
            let mut supervisor = self.supervisor.lock();
            let mut waiters = self.waiters.lock();
            if fatal.is_none() && !waiters.is_empty() {
                self.state.write().reset_attempts();
                return false;
            }

            if supervisor.as_ref().map(|s| s.generation) == Some(generation) {
                *supervisor = None;
            }
            self.state.write().mark_abandoned();

            for waiter in waiters.drain(..) {
                let error = match fatal {
                    Some(message) => ClientError::Configuration(message.to_string()),
                    None => ClientError::WebSocketConnection("reconnect abandoned".to_string()),
                };
                let _ = waiter.send(Err(error));
            }
        }
        self.publish(ConnectionStatus::GaveUp);
        true
    }

    async fn supervise(self: Arc<Self>, generation: u64, mut shutdown: watch::Receiver<bool>) {
        let max_attempts = self.config.max_reconnect_attempts;

        loop {
            self.state.write().mark_connecting();

            let url = match self.endpoint() {
                Ok(url) => url,
                Err(e) => {
                    error!("{}", e);
                    let message = match e {
                        ClientError::Configuration(message) => message,
                        other => other.to_string(),
                    };
                    self.try_abandon(generation, Some(&message));
                    return;
                }
            };

            info!(
                "Connecting to push server: {}{}",
                url.origin().ascii_serialization(),
                url.path()
            );

            let attempt = tokio::select! {
                result = timeout(self.config.connect_timeout(), connect_async(url.as_str())) => result,
                _ = shutdown.changed() => return,
            };

            match attempt {
                Ok(Ok((ws_stream, _response))) => {
                    if *shutdown.borrow() {
                        return;
                    }
                    match self.run_session(ws_stream, &mut shutdown).await {
                        SessionEnd::Shutdown => return,
                        SessionEnd::Restart => continue,
                        SessionEnd::Closed(reason) => {
                            info!("WebSocket closed: {:?}", reason);
                            self.publish(ConnectionStatus::Disconnected(reason));
                        }
                        SessionEnd::Failed(reason) => {
                            error!("WebSocket error: {}", reason);
                            self.publish(ConnectionStatus::Error(reason));
                        }
                    }
                }
                Ok(Err(e)) => {
                    let message = e.to_string();
                    warn!("WebSocket connection failed: {}", message);
                    self.resolve_waiters(|| Err(ClientError::WebSocketConnection(message.clone())));
                    self.publish(ConnectionStatus::Error(message));
                }
                Err(_) => {
                    let message = format!(
                        "connect did not complete within {:?}",
                        self.config.connect_timeout()
                    );
                    warn!("{}", message);
                    self.resolve_waiters(|| Err(ClientError::Timeout(message.clone())));
                    self.publish(ConnectionStatus::Error(message));
                }
            }

            self.state.write().mark_disconnected();

            let attempts = self.state.read().reconnect_attempts;
            if attempts >= max_attempts {
                if self.try_abandon(generation, None) {
                    error!(
                        "Reconnect limit reached ({}/{}), giving up",
                        attempts, max_attempts
                    );
                    return;
                }
                info!("Connect requested after the final attempt, starting over");
                continue;
            }

            tokio::select! {
                _ = sleep(self.config.reconnect_interval()) => {}
                _ = self.connect_now.notified() => {
                    debug!("Reconnect delay skipped by explicit connect");
                }
                _ = shutdown.changed() => return,
            }

            let attempt = self.state.write().begin_reconnect();
            info!("Reconnecting... ({}/{})", attempt, max_attempts);
            self.publish(ConnectionStatus::Reconnecting {
                attempt,
                max_attempts,
            });
        }
    }

    /// Open the session: install the queue, mark connected, release waiters
    fn open_session(&self, tx: mpsc::UnboundedSender<SessionCommand>) {
        let mut waiters = self.waiters.lock();
        *self.outbound.lock() = Some(tx);
        self.state.write().mark_connected();
        for waiter in waiters.drain(..) {
            let _ = waiter.send(Ok(()));
        }
    }

    /// Drop the queue (and anything still in it) and leave the connected state
    fn close_session(&self, end: SessionEnd) -> SessionEnd {
        *self.outbound.lock() = None;
        self.state.write().mark_disconnected();
        end
    }

    async fn run_session(
        &self,
        ws_stream: WsStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionCommand>();

        self.open_session(tx);
        info!("WebSocket connection established");
        self.publish(ConnectionStatus::Connected);

        let replay = self.subscriptions.read().clone();
        if !replay.is_empty() {
            let frame = OutboundMessage::Subscribe { ts_codes: replay };
            match frame.to_json() {
                Ok(json) => {
                    debug!("Replaying subscriptions: {}", json);
                    if let Err(e) = write.send(Message::Text(json)).await {
                        return self.close_session(SessionEnd::Failed(e.to_string()));
                    }
                }
                Err(e) => error!("Failed to encode subscription replay: {}", e),
            }
        }

        let period = self.config.heartbeat_interval();
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let end = loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    break SessionEnd::Shutdown;
                }
                command = rx.recv() => match command {
                    Some(SessionCommand::Frame(message)) => {
                        if let Err(e) = write.send(message).await {
                            break SessionEnd::Failed(e.to_string());
                        }
                    }
                    Some(SessionCommand::Reconnect) => {
                        let _ = write.send(Message::Close(None)).await;
                        break SessionEnd::Restart;
                    }
                    None => break SessionEnd::Failed("session queue closed".to_string()),
                },
                _ = heartbeat.tick() => {
                    match OutboundMessage::Ping.to_json() {
                        Ok(ping) => {
                            debug!("Sending heartbeat");
                            if let Err(e) = write.send(Message::Text(ping)).await {
                                break SessionEnd::Failed(e.to_string());
                            }
                            self.state.write().record_ping();
                        }
                        Err(e) => error!("Failed to encode ping: {}", e),
                    }
                }
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text),
                        Some(Ok(Message::Ping(_))) => debug!("Received Ping"),
                        Some(Ok(Message::Pong(_))) => debug!("Received Pong"),
                        Some(Ok(Message::Close(frame))) => {
                            break SessionEnd::Closed(frame.map(|f| f.reason.to_string()));
                        }
                        Some(Ok(_)) => debug!("Ignoring non-text frame"),
                        Some(Err(e)) => break SessionEnd::Failed(e.to_string()),
                        None => break SessionEnd::Closed(None),
                    }
                }
            }
        };

        self.close_session(end)
    }

    fn handle_text(&self, text: &str) {
        self.state.write().record_message();

        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to parse message: {} - {}", e, text);
                return;
            }
        };

        match &message.kind {
            kind if kind.is_dispatchable() => {
                let invoked = self.handlers.notify(kind, &message.payload());
                debug!("Dispatched {} to {} listeners", kind, invoked);
            }
            MessageKind::Pong => debug!("Received pong"),
            MessageKind::ConnectionEstablished => {
                info!(
                    "Push server ready: {}",
                    message.message.as_deref().unwrap_or_default()
                );
            }
            MessageKind::SubscriptionSuccess | MessageKind::UnsubscriptionSuccess => {
                debug!(
                    "{}: {:?}",
                    message.kind,
                    message.subscribed_stocks.as_deref().unwrap_or_default()
                );
            }
            MessageKind::Unknown(tag) => info!("Unknown message type: {}", tag),
            kind => debug!("Not dispatching {}", kind),
        }
    }
}

fn dedup(codes: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for code in codes {
        if !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

#[async_trait]
impl StreamClient for RealtimeClient {
    async fn connect(&self) -> Result<()> {
        RealtimeClient::connect(self).await
    }

    async fn subscribe(&self, ts_codes: &[String]) -> Result<()> {
        RealtimeClient::subscribe(self, ts_codes.iter().cloned())
    }

    async fn unsubscribe(&self, ts_codes: &[String]) -> Result<()> {
        RealtimeClient::unsubscribe(self, ts_codes.iter().cloned())
    }

    async fn disconnect(&self) -> Result<()> {
        RealtimeClient::disconnect(self).await;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        RealtimeClient::is_connected(self)
    }
}
