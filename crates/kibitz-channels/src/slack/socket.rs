//! Socket Mode receive loop and Platform trait implementation.

use super::events::{normalize, thread_entry};
use super::types::SocketEnvelope;
use super::SlackPlatform;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use kibitz_core::{
    error::KibitzError,
    message::{InboundEvent, OutgoingMessage, ThreadEntry},
    traits::Platform,
};
use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

/// How a websocket session ended.
enum SessionEnd {
    /// Slack rotated the connection or the socket closed cleanly.
    Reconnect,
    /// `stop()` was called or nobody is listening any more.
    Shutdown,
}

impl SlackPlatform {
    async fn resolve_bot_user_id(&self) -> Result<String, KibitzError> {
        let mut cached = self.bot_user_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }
        let id = self.api.bot_user_id().await?;
        info!("slack: authenticated as {id}");
        *cached = Some(id.clone());
        Ok(id)
    }
}

#[async_trait]
impl Platform for SlackPlatform {
    fn name(&self) -> &str {
        "slack"
    }

    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, KibitzError> {
        if self.config.app_token.trim().is_empty() || self.config.bot_token.trim().is_empty() {
            return Err(KibitzError::Config(
                "slack needs both app_token and bot_token".into(),
            ));
        }
        let bot_user_id = self.resolve_bot_user_id().await?;

        let (tx, rx) = mpsc::channel(64);
        let api = self.api.clone();
        let mut shutdown = self.shutdown.subscribe();

        info!("Slack platform starting socket mode...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                if *shutdown.borrow() {
                    break;
                }

                let url = match api.open_connection().await {
                    Ok(url) => url,
                    Err(e) => {
                        error!("slack connect error (retry in {backoff_secs}s): {e}");
                        if pause(&mut shutdown, backoff_secs).await {
                            break;
                        }
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                match run_session(&url, &bot_user_id, &tx, &mut shutdown).await {
                    Ok(SessionEnd::Shutdown) => break,
                    Ok(SessionEnd::Reconnect) => {
                        debug!("slack socket rotated, reconnecting");
                        backoff_secs = 1;
                    }
                    Err(e) => {
                        error!("slack socket error (retry in {backoff_secs}s): {e}");
                        if pause(&mut shutdown, backoff_secs).await {
                            break;
                        }
                        backoff_secs = (backoff_secs * 2).min(60);
                    }
                }
            }

            info!("Slack socket loop stopped");
        });

        Ok(rx)
    }

    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), KibitzError> {
        self.api
            .post_message(&message.channel, &message.text, message.thread.as_deref())
            .await
    }

    async fn thread_replies(
        &self,
        channel: &str,
        thread: &str,
    ) -> Result<Vec<ThreadEntry>, KibitzError> {
        let bot_user_id = self.resolve_bot_user_id().await?;
        let messages = self.api.replies(channel, thread).await?;
        Ok(messages
            .into_iter()
            .map(|m| thread_entry(m, &bot_user_id))
            .collect())
    }

    async fn display_name(&self, user_id: &str) -> Result<String, KibitzError> {
        if let Some(name) = self.names.lock().await.get(user_id) {
            return Ok(name.clone());
        }
        let name = self
            .api
            .profile_name(user_id)
            .await?
            .unwrap_or_else(|| user_id.to_string());
        self.names
            .lock()
            .await
            .insert(user_id.to_string(), name.clone());
        Ok(name)
    }

    async fn stop(&self) -> Result<(), KibitzError> {
        self.shutdown.send_replace(true);
        Ok(())
    }
}

/// Sleep unless shutdown arrives first. Returns true on shutdown.
async fn pause(shutdown: &mut watch::Receiver<bool>, secs: u64) -> bool {
    tokio::select! {
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
        _ = tokio::time::sleep(Duration::from_secs(secs)) => false,
    }
}

async fn run_session(
    url: &str,
    bot_user_id: &str,
    tx: &mpsc::Sender<InboundEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<SessionEnd, KibitzError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| KibitzError::Platform(format!("slack websocket connect failed: {e}")))?;
    let (mut sink, mut source) = stream.split();
    info!("slack socket connected");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
            frame = source.next() => {
                let Some(frame) = frame else {
                    return Ok(SessionEnd::Reconnect);
                };
                let frame = frame
                    .map_err(|e| KibitzError::Platform(format!("slack websocket read failed: {e}")))?;
                let text = match frame {
                    WsMessage::Text(text) => text,
                    WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!("slack: dropping non-utf8 frame");
                            continue;
                        }
                    },
                    WsMessage::Close(_) => return Ok(SessionEnd::Reconnect),
                    WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
                };

                let envelope: SocketEnvelope = match serde_json::from_str(&text) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!("slack: unreadable socket frame: {e}");
                        continue;
                    }
                };

                if let Some(id) = envelope.envelope_id.as_deref() {
                    let ack = json!({ "envelope_id": id }).to_string();
                    sink.send(WsMessage::Text(ack))
                        .await
                        .map_err(|e| KibitzError::Platform(format!("slack ack failed: {e}")))?;
                }

                match envelope.envelope_type.as_str() {
                    "hello" => debug!("slack socket hello"),
                    "disconnect" => return Ok(SessionEnd::Reconnect),
                    _ => {
                        if let Some(event) = normalize(&envelope, bot_user_id) {
                            if tx.send(event).await.is_err() {
                                info!("slack: receiver dropped, closing socket");
                                return Ok(SessionEnd::Shutdown);
                            }
                        }
                    }
                }
            }
        }
    }
}
