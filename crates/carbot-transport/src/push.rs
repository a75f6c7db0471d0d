//! Live event socket.
//!
//! One JSON text frame per event. The stream ends (`next_event` returns
//! `None`) on connection loss; reconnecting is the supervisor's job, not
//! this stream's.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use carbot_core::{PanelError, PanelResult};

use crate::wire::decode_push_frame;
use crate::{PushEvent, PushStream};

/// Push endpoint for a REST base url.
pub fn push_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws}/events")
}

/// WebSocket-backed `PushStream`.
pub struct WsPushStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsPushStream {
    pub async fn connect(url: &str) -> PanelResult<Self> {
        debug!(%url, "connecting push socket");
        let (inner, _) = connect_async(url)
            .await
            .map_err(|e| PanelError::Transport(e.to_string()))?;
        Ok(WsPushStream { inner })
    }
}

#[async_trait]
impl PushStream for WsPushStream {
    async fn next_event(&mut self) -> Option<PushEvent> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => match decode_push_frame(&text) {
                    Ok(Some(event)) => return Some(event),
                    Ok(None) => debug!("skipping unconsumed push event"),
                    Err(err) => warn!(%err, "undecodable push frame"),
                },
                Some(Ok(Message::Ping(payload))) => {
                    if self.inner.send(Message::Pong(payload)).await.is_err() {
                        return None;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(%err, "push socket error");
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_url() {
        assert_eq!(push_url("http://10.0.0.2:5500"), "ws://10.0.0.2:5500/events");
        assert_eq!(push_url("https://carbot.example/"), "wss://carbot.example/events");
    }
}
