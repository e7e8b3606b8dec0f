use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::control::Command;

/// What the socket hands to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// One binary message, still encoded
    Message(Vec<u8>),
    /// The connection is gone; nothing more will arrive
    Disconnected(String),
}

/// WebSocket connection to the camera server.
///
/// Binary messages are forwarded untouched, commands go out as text frames.
/// There is no reconnect: once the socket closes the viewer only shows the
/// last frame.
pub struct ViewerClient {
    url: String,
}

impl ViewerClient {
    pub fn new(url: String) -> Self {
        Self { url }
    }

    pub async fn connect(
        &self,
    ) -> Result<(
        mpsc::UnboundedSender<Command>,
        mpsc::UnboundedReceiver<ClientEvent>,
    )> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.url))?;
        log::info!("WebSocket connected to {}", self.url);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<ClientEvent>();

        // Receiver task
        tokio::spawn(async move {
            let reason = loop {
                match ws_receiver.next().await {
                    Some(Ok(WsMessage::Binary(data))) => {
                        if event_tx.send(ClientEvent::Message(data)).is_err() {
                            // UI is gone
                            return;
                        }
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        log::debug!("Ignoring text message: {}", text);
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        break match frame {
                            Some(frame) if !frame.reason.is_empty() => {
                                format!("Server closed the connection: {}", frame.reason)
                            }
                            _ => "Server closed the connection".to_string(),
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break format!("Connection error: {}", e),
                    None => break "Connection closed".to_string(),
                }
            };
            log::warn!("{}", reason);
            let _ = event_tx.send(ClientEvent::Disconnected(reason));
        });

        // Sender task: one text frame per command, no retry
        tokio::spawn(async move {
            while let Some(command) = cmd_rx.recv().await {
                let text = command.to_wire();
                log::debug!("-> {}", text);
                if let Err(e) = ws_sender.send(WsMessage::Text(text)).await {
                    log::warn!("Dropped command {:?}: {}", command, e);
                }
            }
            let _ = ws_sender.close().await;
        });

        Ok((cmd_tx, event_rx))
    }
}
