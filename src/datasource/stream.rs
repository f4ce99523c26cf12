//! WebSocket market stream keeping the book store warm.

use crate::datasource::polymarket::parse_book;
use crate::domain::{TimeMs, TokenId};
use crate::engine::BookStore;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Duration};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};
use url::Url;

/// Reconnect backoff cap.
const MAX_BACKOFF_SECS: u64 = 60;

enum StreamExit {
    Shutdown,
    Disconnected,
}

/// Exponential delay before the next connection attempt, capped. Zero
/// retries means the first attempt of a session and gets no delay.
fn reconnect_delay_secs(retry_count: u32) -> u64 {
    if retry_count == 0 {
        0
    } else {
        std::cmp::min(
            2u64.saturating_pow(retry_count.saturating_sub(1)),
            MAX_BACKOFF_SECS,
        )
    }
}

/// Subscription-based book feed.
///
/// Owns the pending-subscription queue: the tracker pushes newly seen
/// tokens through the returned sender, and a send that fails mid-connect
/// is re-enqueued so subscriptions are delivered at least once. Book
/// events replace the stored snapshot wholesale.
pub struct MarketStream {
    ws_url: String,
    store: Arc<BookStore>,
    sub_tx: mpsc::UnboundedSender<TokenId>,
    sub_rx: mpsc::UnboundedReceiver<TokenId>,
}

impl MarketStream {
    /// Create a stream and the sender used to request subscriptions.
    pub fn new(ws_url: String, store: Arc<BookStore>) -> (Self, mpsc::UnboundedSender<TokenId>) {
        let (sub_tx, sub_rx) = mpsc::unbounded_channel();
        let handle = sub_tx.clone();
        (
            Self {
                ws_url,
                store,
                sub_tx,
                sub_rx,
            },
            handle,
        )
    }

    /// Run until shutdown, reconnecting with capped exponential backoff.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut retry_count: u32 = 0;

        loop {
            let backoff_secs = reconnect_delay_secs(retry_count);

            if backoff_secs > 0 {
                debug!(
                    "Reconnecting stream in {}s (attempt {})",
                    backoff_secs,
                    retry_count.saturating_add(1)
                );
                tokio::select! {
                    _ = sleep(Duration::from_secs(backoff_secs)) => {}
                    _ = shutdown.changed() => return,
                }
            }

            match self.connect_and_listen(&mut shutdown, &mut retry_count).await {
                Ok(StreamExit::Shutdown) => return,
                Ok(StreamExit::Disconnected) => {
                    // A server that accepts and immediately closes must not
                    // be hammered: a clean close still counts as a retry.
                    info!("Order book stream closed by server");
                    retry_count = retry_count.saturating_add(1);
                }
                Err(e) => {
                    retry_count = retry_count.saturating_add(1);
                    warn!("Order book stream error (attempt {}): {}", retry_count, e);
                }
            }
        }
    }

    async fn connect_and_listen(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
        retry_count: &mut u32,
    ) -> anyhow::Result<StreamExit> {
        // Parse first so a bad URL surfaces as a clear error.
        Url::parse(&self.ws_url)?;
        let (ws_stream, _) = connect_async(self.ws_url.as_str()).await?;
        *retry_count = 0;
        let (mut write, mut read) = ws_stream.split();

        // Resubscribe everything still tracked so a reconnect does not
        // silently drop registry entries.
        let tracked = self.store.tracked();
        let assets: Vec<&str> = tracked.iter().map(|t| t.as_str()).collect();
        let hello = serde_json::json!({ "type": "market", "assets_ids": assets });
        write.send(Message::Text(hello.to_string())).await?;
        info!("Order book stream connected ({} tracked tokens)", tracked.len());

        loop {
            tokio::select! {
                msg_result = read.next() => {
                    match msg_result {
                        Some(Ok(Message::Text(text))) => self.handle_message(&text),
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Ok(StreamExit::Disconnected);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                }

                Some(token) = self.sub_rx.recv() => {
                    let sub = serde_json::json!({
                        "assets_ids": [token.as_str()],
                        "operation": "subscribe"
                    });
                    if let Err(e) = write.send(Message::Text(sub.to_string())).await {
                        // At-least-once: put it back and reconnect.
                        let _ = self.sub_tx.send(token);
                        return Err(e.into());
                    }
                    debug!("Subscribed to book updates");
                }

                _ = shutdown.changed() => return Ok(StreamExit::Shutdown),
            }
        }
    }

    /// Decode one frame; the channel delivers either a single event or a
    /// batch. Anything that is not a book event is ignored.
    fn handle_message(&self, text: &str) {
        let data: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                debug!("Ignoring undecodable stream frame: {}", e);
                return;
            }
        };

        let events = match data {
            serde_json::Value::Array(events) => events,
            other => vec![other],
        };

        for event in &events {
            self.apply_event(event);
        }
    }

    fn apply_event(&self, event: &serde_json::Value) {
        let is_book = event.get("event_type").and_then(|v| v.as_str()) == Some("book");
        let asset_id = event.get("asset_id").and_then(|v| v.as_str());
        if let (true, Some(asset_id)) = (is_book, asset_id) {
            let book = parse_book(event, TimeMs::now());
            self.store.update(TokenId::new(asset_id.to_string()), book);
        }
    }
}
