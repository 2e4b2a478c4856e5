//! Realtime WebSocket connection and socket.io v1 frame handling

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::models::OutboundEvent;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Handshake parameters returned by the socket.io session endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub session_id: String,
    /// Heartbeat timeout in seconds; we ping at half this interval.
    pub heartbeat_secs: u64,
}

/// Parse a socket.io v1 handshake body: `"{sid}:{hb}:{timeout}:{transports}"`.
pub fn parse_handshake(body: &str) -> Result<Handshake> {
    let mut parts = body.trim().split(':');
    let session_id = parts
        .next()
        .filter(|s| !s.is_empty())
        .context("Empty handshake response")?
        .to_string();
    let heartbeat_secs = parts.next().and_then(|s| s.parse().ok()).unwrap_or(60);

    Ok(Handshake {
        session_id,
        heartbeat_secs,
    })
}

/// Negotiate a socket.io session, returning handshake parameters.
pub async fn negotiate(http: &reqwest::Client, server_url: &str, token: &str) -> Result<Handshake> {
    let epid = uuid::Uuid::new_v4().to_string();
    let token_q: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    let url = format!(
        "{}/socket.io/1/?token={}&epid={}",
        server_url, token_q, epid
    );

    tracing::info!("Negotiating realtime session (epid={})", epid);

    let resp = http
        .get(&url)
        .bearer_auth(token)
        .send()
        .await
        .context("Realtime session negotiation request failed")?;

    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Realtime session negotiation failed: {} -- {}", status, text);
    }
    tracing::debug!("Handshake response: {}", text);

    let handshake = parse_handshake(&text)?;
    tracing::info!("Got realtime session ID: {}", handshake.session_id);
    Ok(handshake)
}

pub struct MispaSocket {
    stream: WsStream,
}

impl MispaSocket {
    /// Connect to the realtime WebSocket endpoint.
    ///
    /// Auth is carried by the session ID in the URL (obtained via the
    /// authenticated handshake); the WebSocket itself needs no headers.
    pub async fn connect(server_url: &str, handshake: &Handshake, token: &str) -> Result<Self> {
        let token_q: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
        let ws_url = format!(
            "{}/socket.io/1/websocket/{}?token={}",
            server_url, handshake.session_id, token_q
        );
        let ws_url = ws_url
            .replace("https://", "wss://")
            .replace("http://", "ws://");

        tracing::info!("Connecting WebSocket to {}", ws_url);

        let (stream, response) = connect_async(&ws_url)
            .await
            .context("WebSocket connection failed")?;

        tracing::info!("WebSocket connected (status={})", response.status());

        Ok(Self { stream })
    }

    /// Send a raw text frame.
    pub async fn send_text(&mut self, msg: &str) -> Result<()> {
        tracing::debug!("WS send: {}", msg);
        self.stream
            .send(Message::Text(msg.to_string()))
            .await
            .context("Failed to send WebSocket message")
    }

    /// Emit an event as a `5:::` frame.
    pub async fn emit(&mut self, event: &OutboundEvent) -> Result<()> {
        let frame = encode_event(event);
        self.send_text(&frame).await
    }

    /// Receive the next text frame, ignoring pings/pongs.
    ///
    /// Event frames that carry an ack ID (`5:ID::`) are acked automatically;
    /// without acks the server retries delivery and blocks newer events.
    pub async fn recv_frame(&mut self) -> Result<Option<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("WS recv: {}", text);

                    if let Some(ack_id) = extract_ack_id(&text) {
                        let ack = format!("6:{}::", ack_id);
                        tracing::debug!("Event ack: {}", ack);
                        if let Err(e) = self.stream.send(Message::Text(ack)).await {
                            tracing::warn!("Failed to send event ack: {:#}", e);
                        }
                    }

                    return Ok(Some(text));
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .context("Failed to send pong")?;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("WebSocket closed: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(e).context("WebSocket receive error");
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }
}

/// Encode an outbound event as a socket.io v1 event frame.
pub fn encode_event(event: &OutboundEvent) -> String {
    let body = serde_json::json!({
        "name": event.name(),
        "args": [event.payload()],
    });
    format!("5:::{}", body)
}

/// Decode a `5:` event frame into its name and first argument.
///
/// Frame format is `5:ACK_ID:ENDPOINT:JSON`; ack id and endpoint are
/// usually empty (`5:::{...}`).
pub fn decode_event(frame: &str) -> Option<(String, serde_json::Value)> {
    let rest = frame.strip_prefix("5:")?;
    let json_str = rest.find("::").map(|pos| &rest[pos + 2..])?;
    if !json_str.starts_with('{') {
        return None;
    }

    let body: serde_json::Value = serde_json::from_str(json_str).ok()?;
    let name = body.get("name")?.as_str()?.to_string();
    let payload = body
        .get("args")
        .and_then(|args| args.get(0))
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    Some((name, payload))
}

/// Extract the ack ID from a `5:ID::` event frame, if present.
fn extract_ack_id(frame: &str) -> Option<u64> {
    let rest = frame.strip_prefix("5:")?;
    let colon_pos = rest.find(':')?;
    let id_part = &rest[..colon_pos];
    if id_part.is_empty() {
        return None;
    }
    id_part.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_handshake_body() {
        let hs = parse_handshake("abc123:60:120:websocket,xhr-polling").unwrap();
        assert_eq!(hs.session_id, "abc123");
        assert_eq!(hs.heartbeat_secs, 60);
    }

    #[test]
    fn parse_handshake_rejects_empty() {
        assert!(parse_handshake("").is_err());
    }

    #[test]
    fn encode_decode_round_trip() {
        let event = OutboundEvent::Typing {
            chat_id: 5,
            is_typing: true,
        };
        let frame = encode_event(&event);
        assert!(frame.starts_with("5:::{"));

        let (name, payload) = decode_event(&frame).unwrap();
        assert_eq!(name, "typing");
        assert_eq!(payload, json!({"chat_id": 5, "is_typing": true}));
    }

    #[test]
    fn decode_event_with_ack_id() {
        let frame = r#"5:17::{"name":"new_message","args":[{"id":1}]}"#;
        let (name, payload) = decode_event(frame).unwrap();
        assert_eq!(name, "new_message");
        assert_eq!(payload, json!({"id": 1}));
        assert_eq!(extract_ack_id(frame), Some(17));
    }

    #[test]
    fn non_event_frames_are_not_decoded() {
        assert!(decode_event("2::").is_none());
        assert!(decode_event("1::").is_none());
        assert!(extract_ack_id("5:::{}").is_none());
    }
}
