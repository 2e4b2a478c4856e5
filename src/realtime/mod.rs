//! Realtime push channel client
//!
//! Maintains a single live socket.io-style connection to the server and
//! bridges it to the rest of the client over mpsc channels: outbound events
//! (`typing`, `send_message`) flow in, inbound pushes (`new_message`,
//! `typing_status`, `user_status`) flow out. Reconnects with exponential
//! backoff on transient errors.

pub mod socket;

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;

use crate::auth::TokenStore;
use crate::config::Config;
use crate::models::{InboundEvent, OutboundEvent};
use socket::MispaSocket;

/// Connection lifecycle and event updates delivered to the consumer.
#[derive(Debug)]
pub enum RealtimeUpdate {
    Connected,
    Disconnected,
    Event(InboundEvent),
    /// No usable token; the channel will not reconnect.
    AuthError(String),
}

/// Handle for talking to the realtime channel.
pub struct RealtimeHandle {
    /// Send side for `typing` / `send_message` emits.
    pub outbound: mpsc::UnboundedSender<OutboundEvent>,
    /// Receive side for connection updates and inbound events.
    pub updates: mpsc::UnboundedReceiver<RealtimeUpdate>,
}

/// Spawn the realtime connection loop as a background task.
///
/// The loop runs until the returned handle is dropped (both channel ends
/// closed) or the stored token is unusable.
pub fn spawn() -> RealtimeHandle {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    tokio::spawn(run_loop(out_rx, update_tx));

    RealtimeHandle {
        outbound: out_tx,
        updates: update_rx,
    }
}

/// Connection loop with automatic reconnection.
///
/// Backoff doubles from 1s up to 64s, and resets after a connection that
/// stayed up for at least 60s.
async fn run_loop(
    mut out_rx: mpsc::UnboundedReceiver<OutboundEvent>,
    update_tx: mpsc::UnboundedSender<RealtimeUpdate>,
) {
    let mut backoff = 1u64;
    let stability_threshold = Duration::from_secs(60);

    loop {
        let connected_at = Instant::now();

        match run_session(&mut out_rx, &update_tx).await {
            Ok(SessionEnd::ConsumerGone) => return,
            Ok(SessionEnd::ServerClosed) => {
                tracing::warn!("Realtime connection closed by server");
            }
            Err(e) => {
                if is_auth_error(&e) {
                    let _ = update_tx.send(RealtimeUpdate::AuthError(format!("{:#}", e)));
                    return;
                }
                tracing::warn!("Realtime connection error: {:#}", e);
            }
        }

        if update_tx.send(RealtimeUpdate::Disconnected).is_err() {
            return;
        }

        if connected_at.elapsed() >= stability_threshold {
            backoff = 1;
        }

        tracing::info!("Reconnecting in {}s...", backoff);
        time::sleep(Duration::from_secs(backoff)).await;
        backoff = (backoff * 2).min(64);
    }
}

/// Why a session ended without an error.
enum SessionEnd {
    /// The consumer dropped its handle; stop for good.
    ConsumerGone,
    /// The server closed the socket; reconnect.
    ServerClosed,
}

fn is_auth_error(e: &anyhow::Error) -> bool {
    let msg = format!("{:#}", e);
    msg.contains("No token stored") || msg.contains("expired") || msg.contains("401")
}

/// Run one full realtime session: negotiate, connect, event loop.
async fn run_session(
    out_rx: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    update_tx: &mpsc::UnboundedSender<RealtimeUpdate>,
) -> Result<SessionEnd> {
    // Reload config each attempt so a re-login is picked up.
    let config = Config::load().context("Failed to load config")?;
    let token = config
        .get_token()
        .context("No token stored. Run 'mispa-cli login' first.")?;
    anyhow::ensure!(
        !token.is_expired(),
        "Stored token expired. Run 'mispa-cli login'."
    );

    let http = reqwest::Client::new();
    let server_url = config.server_url();

    let handshake = socket::negotiate(&http, &server_url, &token.token).await?;
    let mut ws = MispaSocket::connect(&server_url, &handshake, &token.token).await?;

    // Wait for the 1:: handshake frame.
    let frame = ws
        .recv_frame()
        .await?
        .context("Connection closed before handshake")?;
    if !frame.starts_with("1::") {
        tracing::warn!("Expected 1:: handshake, got: {}", frame);
    }

    if update_tx.send(RealtimeUpdate::Connected).is_err() {
        return Ok(SessionEnd::ConsumerGone);
    }

    let heartbeat_secs = (handshake.heartbeat_secs / 2).max(5);
    let mut heartbeat = time::interval(Duration::from_secs(heartbeat_secs));
    heartbeat.tick().await; // skip first immediate tick

    loop {
        tokio::select! {
            frame = ws.recv_frame() => {
                match frame {
                    Ok(Some(text)) => {
                        if let Some(update) = handle_frame(&text) {
                            if update_tx.send(update).is_err() {
                                return Ok(SessionEnd::ConsumerGone);
                            }
                        }
                    }
                    Ok(None) => return Ok(SessionEnd::ServerClosed),
                    Err(e) => return Err(e.context("WebSocket recv error")),
                }
            }
            outbound = out_rx.recv() => {
                match outbound {
                    Some(event) => {
                        tracing::debug!("Emitting {} event", event.name());
                        ws.emit(&event).await.context("Event emit failed")?;
                    }
                    None => return Ok(SessionEnd::ConsumerGone),
                }
            }
            _ = heartbeat.tick() => {
                ws.send_text("2::").await.context("Heartbeat send failed")?;
            }
        }
    }
}

/// Turn an incoming frame into an update, if it carries one.
fn handle_frame(frame: &str) -> Option<RealtimeUpdate> {
    if frame.starts_with("2::") {
        tracing::debug!("Heartbeat ping from server");
        return None;
    }

    if frame.starts_with("5:") {
        let (name, payload) = socket::decode_event(frame)?;
        return match InboundEvent::parse(&name, &payload) {
            Some(event) => Some(RealtimeUpdate::Event(event)),
            None => {
                tracing::debug!("Ignoring event '{}': {}", name, payload);
                None
            }
        };
    }

    tracing::debug!("Unhandled frame: {}", frame);
    None
}

/// Connect and print incoming events until Ctrl-C (the `listen` subcommand).
pub async fn listen() -> Result<()> {
    let mut handle = spawn();

    println!("Listening for events... (Ctrl-C to stop)");

    loop {
        tokio::select! {
            update = handle.updates.recv() => {
                match update {
                    Some(RealtimeUpdate::Connected) => println!("Connected."),
                    Some(RealtimeUpdate::Disconnected) => println!("Disconnected, retrying..."),
                    Some(RealtimeUpdate::Event(event)) => print_event(&event),
                    Some(RealtimeUpdate::AuthError(msg)) => {
                        anyhow::bail!("{}", msg);
                    }
                    None => return Ok(()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down...");
                return Ok(());
            }
        }
    }
}

fn print_event(event: &InboundEvent) {
    match event {
        InboundEvent::NewMessage(msg) => {
            let time = msg.timestamp.as_deref().unwrap_or("");
            println!("[MSG] {} {}: {}", time, msg.sender_id, msg.content);
        }
        InboundEvent::TypingStatus(status) => {
            if status.is_typing {
                println!("[TYPING] user {} is typing...", status.user_id);
            } else {
                println!("[TYPING] user {} stopped typing", status.user_id);
            }
        }
        InboundEvent::UserStatus(status) => {
            let state = if status.online { "online" } else { "offline" };
            println!("[STATUS] user {} is {}", status.user_id, state);
        }
    }
}
