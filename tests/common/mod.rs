//! Common test utilities and fixtures
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Message;

use stock_dashboard_client::RealtimeConfig;

/// Upper bound for any single wait in the tests
pub const WAIT: Duration = Duration::from_secs(5);

/// Config pointing at `addr` with fast timers
pub fn fast_config(addr: SocketAddr) -> RealtimeConfig {
    RealtimeConfig {
        websocket_url: format!("ws://{}/ws", addr),
        heartbeat_interval_ms: 60_000,
        reconnect_interval_ms: 50,
        max_reconnect_attempts: 5,
        connect_timeout_seconds: 5,
        ..RealtimeConfig::default()
    }
}

/// An address nothing listens on
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

enum Command {
    Send(String),
    Close,
}

/// Server side of one accepted connection
pub struct ServerConn {
    /// Request URI of the handshake, including the query string
    pub uri: String,
    received: mpsc::UnboundedReceiver<String>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ServerConn {
    /// Next frame from the client, parsed as JSON
    pub async fn recv_json(&mut self) -> Value {
        let text = timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("connection ended");
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Skip frames until one with the given `type` arrives
    pub async fn recv_type(&mut self, kind: &str) -> Value {
        loop {
            let frame = self.recv_json().await;
            if frame["type"] == kind {
                return frame;
            }
        }
    }

    pub fn send(&self, frame: Value) {
        let _ = self.commands.send(Command::Send(frame.to_string()));
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.commands.send(Command::Send(text.to_string()));
    }

    /// Send a close frame and end the connection
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Wait until the client side has gone away
    pub async fn closed(&mut self) {
        timeout(WAIT, async {
            while self.received.recv().await.is_some() {}
        })
        .await
        .expect("client did not close the connection");
    }
}

/// Minimal push server speaking the dashboard's JSON frames
pub struct MockPushServer {
    pub addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<ServerConn>,
    accept_task: JoinHandle<()>,
}

impl MockPushServer {
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap()).await
    }

    /// Start on a fixed address, e.g. one a client already failed to reach
    pub async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (conn_tx, connections) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, conn_tx.clone()));
            }
        });

        Self {
            addr,
            connections,
            accept_task,
        }
    }

    pub async fn next_connection(&mut self) -> ServerConn {
        timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for a client connection")
            .expect("server stopped")
    }

    /// Next connection if one arrives within `wait`
    pub async fn try_next_connection(&mut self, wait: Duration) -> Option<ServerConn> {
        timeout(wait, self.connections.recv()).await.ok().flatten()
    }

    /// Stop accepting; later connection attempts are refused
    pub fn stop_accepting(&self) {
        self.accept_task.abort();
    }
}

/// Accepts TCP connections but never answers the WebSocket handshake
pub async fn silent_listener() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    (addr, handle)
}

async fn serve(stream: TcpStream, conn_tx: mpsc::UnboundedSender<ServerConn>) {
    let uri = Arc::new(Mutex::new(String::new()));
    let captured = uri.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        *captured.lock() = request.uri().to_string();
        Ok(response)
    };

    let Ok(ws) = accept_hdr_async(stream, callback).await else {
        return;
    };
    let (mut write, mut read) = ws.split();

    let hello = json!({
        "type": "connection_established",
        "message": "Connected to general room",
        "timestamp": "2024-01-02T09:30:00"
    });
    if write.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    let (in_tx, received) = mpsc::unbounded_channel();
    let (commands, mut command_rx) = mpsc::unbounded_channel();
    let uri = uri.lock().clone();
    let _ = conn_tx.send(ServerConn {
        uri,
        received,
        commands,
    });

    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(Command::Send(text)) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(Command::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = in_tx.send(text);
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Sample frames pushed by the server
pub mod frames {
    use serde_json::{json, Value};

    pub fn realtime_data() -> Value {
        json!({
            "type": "realtime_data",
            "data": [{
                "ts_code": "000001.SZ",
                "current_price": 10.52,
                "open_price": 10.3,
                "high_price": 10.6,
                "low_price": 10.25,
                "change": 0.22,
                "pct_chg": 2.14,
                "volume": 1520000,
                "amount": 15980000.0,
                "timestamp": "2024-01-02T10:15:00",
                "is_real_time": true
            }],
            "timestamp": "2024-01-02T10:15:00"
        })
    }

    pub fn market_data() -> Value {
        json!({
            "type": "market_data",
            "data": {
                "hot_stocks": [{"ts_code": "600519.SH", "name": "贵州茅台", "pct_chg": 3.1}],
                "market_overview": {"up_count": 2810, "down_count": 1702},
                "latest_news": [],
                "timestamp": "2024-01-02T10:15:05"
            }
        })
    }

    pub fn news_update() -> Value {
        json!({
            "type": "news_update",
            "data": {"id": 42, "title": "央行宣布降准0.5个百分点", "category": "宏观"}
        })
    }
}
