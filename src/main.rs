//! Stock Dashboard Client - Main Entry Point
//!
//! Logs in (optionally), connects to the real-time push service, subscribes
//! to the requested tickers and logs every pushed frame until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use stock_dashboard_client::common::channels::create_event_channel_with_size;
use stock_dashboard_client::config::loader::{load_config, load_from_env, split_codes};
use stock_dashboard_client::{
    ApiClient, ChannelHandler, ConnectionStatus, MessageKind, RealtimeClient, RealtimeEvent, RealtimeQuote,
    SessionStore,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Comma-separated list of ts_codes to subscribe
    #[arg(long)]
    subscribe: Option<String>,

    /// Auth token to use instead of logging in
    #[arg(long, env = "DASHBOARD_TOKEN")]
    token: Option<String>,

    /// Username to log in with
    #[arg(long, env = "DASHBOARD_USERNAME")]
    username: Option<String>,

    /// Password to log in with
    #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn log_event(event: &RealtimeEvent) {
    match event.kind {
        MessageKind::RealtimeData => match event.decode::<Vec<RealtimeQuote>>() {
            Ok(quotes) => {
                for quote in quotes {
                    info!(
                        "{} {} ({}%)",
                        quote.ts_code, quote.current_price, quote.pct_chg
                    );
                }
            }
            Err(e) => warn!("Undecodable realtime_data payload: {}", e),
        },
        MessageKind::StockPrice => match event.decode::<RealtimeQuote>() {
            Ok(quote) => info!("{} {}", quote.ts_code, quote.current_price),
            Err(e) => warn!("Undecodable stock_price payload: {}", e),
        },
        MessageKind::Error => warn!("Server error: {}", event.payload),
        _ => info!("{}: {}", event.kind, event.payload),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config_file_found = Path::new(&args.config).exists();
    let config = if config_file_found {
        load_config(Some(&args.config)).context("loading configuration")?
    } else {
        load_from_env().context("loading configuration from environment")?
    };

    let level = parse_level(args.log_level.as_deref().unwrap_or(&config.settings.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting stock dashboard client");
    if config_file_found {
        info!("Configuration file: {}", args.config);
    } else {
        info!("No configuration file at {}, using environment", args.config);
    }

    let session = SessionStore::new();
    let api = ApiClient::from_config(&config.api, session.clone())?;

    if let Some(token) = args.token {
        session.set_token(Some(token));
    }
    if let (Some(username), Some(password)) = (args.username.as_deref(), args.password.as_deref()) {
        api.login(username, password)
            .await
            .context("logging in")?;
    }
    if session.is_token_expired(chrono::Utc::now()) {
        warn!("Session token has expired; the push server may reject the connection");
    }

    let mut realtime = RealtimeClient::new(config.realtime.clone());
    if let Some(token) = session.token() {
        realtime = realtime.with_token(token);
    }

    if let Some(codes) = args.subscribe.as_deref() {
        realtime.subscribe(split_codes(codes))?;
    }

    let (tx, mut rx) = create_event_channel_with_size(config.settings.event_channel_size);
    for kind in [
        MessageKind::MarketData,
        MessageKind::RealtimeData,
        MessageKind::NewsUpdate,
        MessageKind::StockPrice,
        MessageKind::Error,
    ] {
        realtime.add_message_handler(kind.clone(), Arc::new(ChannelHandler::new(kind, tx.clone())));
    }
    drop(tx);

    let mut status = realtime.status_events();

    if let Err(e) = realtime.connect().await {
        error!("Initial connection failed: {}; retrying in the background", e);
    }

    info!("Subscribed to {:?}", realtime.subscriptions());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
            change = status.recv() => match change {
                Ok(ConnectionStatus::GaveUp) => {
                    error!("Push server unreachable, giving up");
                    break;
                }
                Ok(change) => info!("Connection status: {}", change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {} connection status updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                info!("Received shutdown signal, cleaning up...");
                break;
            }
        }
    }

    realtime.disconnect().await;
    Ok(())
}
