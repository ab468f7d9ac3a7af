// src/certstream/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Subscription to a push feed of certificate update messages
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Open a new subscription.
    ///
    /// The stream yields decoded JSON messages and transport errors. Frames
    /// that are not valid JSON are dropped. It ends when the remote side
    /// closes the connection.
    async fn subscribe(&self) -> Result<BoxStream<'static, Result<Value>>>;
}

/// Certstream-compatible WebSocket feed
#[derive(Debug, Clone)]
pub struct WebSocketStreamClient {
    url: String,
}

impl WebSocketStreamClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StreamClient for WebSocketStreamClient {
    async fn subscribe(&self) -> Result<BoxStream<'static, Result<Value>>> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.url))?;

        info!("Connected to {}", self.url);

        let messages = ws_stream
            .take_while(|frame| std::future::ready(!matches!(frame, Ok(Message::Close(_)))))
            .filter_map(|frame| {
                std::future::ready(match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                        Ok(value) => Some(Ok(value)),
                        Err(e) => {
                            debug!("Skipping undecodable message: {}", e);
                            None
                        }
                    },
                    Ok(other) => {
                        debug!("Ignoring non-text frame ({} bytes)", other.len());
                        None
                    }
                    Err(e) => Some(Err(anyhow::Error::new(e).context("WebSocket read failed"))),
                })
            });

        Ok(messages.boxed())
    }
}

/// Replays a fixed set of messages, then ends
#[derive(Debug, Clone, Default)]
pub struct StaticStream {
    messages: Vec<Value>,
}

impl StaticStream {
    pub fn new(messages: Vec<Value>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl StreamClient for StaticStream {
    async fn subscribe(&self) -> Result<BoxStream<'static, Result<Value>>> {
        Ok(stream::iter(self.messages.clone().into_iter().map(Ok)).boxed())
    }
}
