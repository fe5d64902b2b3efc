//! WebSocket-backed push channel.
//!
//! Runs a background task that connects to the board server's push endpoint,
//! decodes text frames into [`BoardEvent`]s, and fans them out through a
//! broadcast channel. On disconnect it reconnects with exponential backoff
//! (1s doubling, capped at 5s) and emits [`ChannelMessage::Reconnected`] so
//! the session refetches everything missed during the gap. Malformed frames
//! are logged and dropped; the stream keeps going.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{decode_event, ChannelMessage, PushChannel};
use crate::config::BoardConfig;
use crate::error::Result;

pub struct WsPushChannel {
    url: String,
    reconnect_delay: Duration,
    reconnect_delay_max: Duration,
    tx: broadcast::Sender<ChannelMessage>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WsPushChannel {
    pub fn new(config: &BoardConfig) -> Arc<Self> {
        let (tx, _) = broadcast::channel(1024);
        Arc::new(Self {
            url: config.push_url.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            reconnect_delay_max: Duration::from_millis(config.reconnect_delay_max_ms),
            tx,
            task: Mutex::new(None),
        })
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn connect(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(());
        }
        *task = Some(tokio::spawn(push_loop(
            self.url.clone(),
            self.tx.clone(),
            self.reconnect_delay,
            self.reconnect_delay_max,
        )));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.tx.subscribe()
    }

    async fn disconnect(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
    }
}

async fn push_loop(
    url: String,
    tx: broadcast::Sender<ChannelMessage>,
    delay_initial: Duration,
    delay_max: Duration,
) {
    let mut delay = delay_initial;
    let mut connected_before = false;

    loop {
        info!(url = %url, "push: connecting");

        match connect_async(&url).await {
            Ok((ws_stream, _)) => {
                info!("push: connected");
                delay = delay_initial;

                if connected_before {
                    // Anything emitted during the gap is gone — tell the
                    // session to do a full refetch.
                    let _ = tx.send(ChannelMessage::Reconnected);
                }
                connected_before = true;

                let (_, mut stream) = ws_stream.split();
                while let Some(msg) = stream.next().await {
                    let text = match msg {
                        Ok(Message::Text(t)) => t,
                        Ok(Message::Close(_)) | Err(_) => break,
                        _ => continue,
                    };
                    match decode_event(&text) {
                        Ok(event) => {
                            // No subscribers is fine.
                            let _ = tx.send(ChannelMessage::Event(event));
                        }
                        Err(e) => {
                            // Drop the one bad frame, keep the stream alive.
                            warn!("push: undecodable frame: {e}");
                        }
                    }
                }
                warn!("push: stream closed");
            }
            Err(e) => {
                warn!("push: connection failed: {e}");
            }
        }

        debug!("push: reconnecting in {:?}", delay);
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(delay_max);
    }
}
