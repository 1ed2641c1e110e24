use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use super::error::ServerError;
use super::messages::{ClientMessage, ServerMessage};
use super::{ControlServer, LOG_TARGET};
use crate::playback::{PlaybackOutcome, PlaybackResult};

type Outgoing = mpsc::UnboundedSender<ServerMessage>;

/// Per-connection state: the outgoing queue and the optional volume forwarder.
struct Connection {
    id: Uuid,
    server: Arc<ControlServer>,
    out: Outgoing,
    volume_forwarder: Option<JoinHandle<()>>,
}

#[instrument(skip(server, stream))]
pub(super) async fn handle_connection(
    server: Arc<ControlServer>,
    stream: TcpStream,
    peer: SocketAddr,
) -> Result<(), ServerError> {
    let websocket = accept_async(stream).await?;
    let (mut sink, mut source) = websocket.split();
    let (out, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let mut connection = Connection {
        id: Uuid::new_v4(),
        server: Arc::clone(&server),
        out,
        volume_forwarder: None,
    };
    info!(target: LOG_TARGET, connection_id = %connection.id, %peer, "Control connection opened.");

    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let payload = serde_json::to_string(&message)?;
            sink.send(Message::Text(payload)).await?;
        }
        sink.close().await?;
        Ok::<(), ServerError>(())
    });

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    trace!(target: LOG_TARGET, connection_id = %connection.id, "Received: {}", text);
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(request) => connection.dispatch(request).await,
                        Err(e) => {
                            warn!(target: LOG_TARGET, connection_id = %connection.id, "Unparsable request: {}", e);
                            connection.send(ServerMessage::error(format!("Invalid request: {}", e)));
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(other)) => {
                    debug!(target: LOG_TARGET, connection_id = %connection.id, "Ignoring frame: {:?}", other);
                }
                Some(Err(e)) => {
                    warn!(target: LOG_TARGET, connection_id = %connection.id, "WebSocket read error: {}", e);
                    break;
                }
            },
            _ = server.shutdown.wait() => break,
        }
    }

    connection.unsubscribe();
    info!(target: LOG_TARGET, connection_id = %connection.id, "Control connection closed.");
    // Pending playback tasks hold clones of `out`; the writer ends once they finish.
    drop(connection);
    match writer.await {
        Ok(result) => result,
        Err(e) => {
            error!(target: LOG_TARGET, "Writer task failed: {}", e);
            Ok(())
        }
    }
}

impl Connection {
    fn send(&self, message: ServerMessage) {
        if self.out.send(message).is_err() {
            trace!(target: LOG_TARGET, connection_id = %self.id, "Writer gone, dropping message.");
        }
    }

    async fn dispatch(&mut self, request: ClientMessage) {
        debug!(target: LOG_TARGET, connection_id = %self.id, "Handling {:?}", request);
        match request {
            ClientMessage::Play { file_path } => self.play(file_path).await,
            ClientMessage::Cancel => {
                if !self.server.supervisor.cancel().await {
                    self.send(ServerMessage::error("Nothing is playing"));
                }
            }
            ClientMessage::PlayNow { file_path } => {
                if let Err(e) = self.server.supervisor.play_now(&file_path).await {
                    error!(target: LOG_TARGET, connection_id = %self.id, "PlayNow failed: {}", e);
                    self.send(ServerMessage::error(e.to_string()));
                }
            }
            ClientMessage::SetVolume { percent } => {
                let telemetry = Arc::clone(&self.server.telemetry);
                let out = self.out.clone();
                tokio::spawn(async move {
                    if let Err(e) = telemetry.set_volume(percent.into()).await {
                        let _ = out.send(ServerMessage::error(e.to_string()));
                    }
                });
            }
            ClientMessage::GetVolume => {
                let telemetry = Arc::clone(&self.server.telemetry);
                let out = self.out.clone();
                // Subscribers already receive the reading through the broadcast
                let subscribed = self.volume_forwarder.is_some();
                tokio::spawn(async move {
                    match telemetry.refresh().await {
                        Some(_) if subscribed => {}
                        Some(percent) => {
                            let _ = out.send(ServerMessage::Volume { percent });
                        }
                        None => {
                            let _ = out.send(ServerMessage::error("Volume unknown"));
                        }
                    }
                });
            }
            ClientMessage::SubscribeVolume => self.subscribe(),
            ClientMessage::UnsubscribeVolume => self.unsubscribe(),
        }
    }

    /// Runs one Play request: feedback while playing, then exactly one Result.
    ///
    /// The player is started before the next frame is read, so a Cancel that
    /// follows on this connection always finds it.
    async fn play(&self, file_path: String) {
        let ticket = match self.server.supervisor.start(&file_path).await {
            Ok(ticket) => ticket,
            Err(e) => {
                error!(target: LOG_TARGET, connection_id = %self.id, "Failed to start playback of {}: {}", file_path, e);
                let outcome = PlaybackOutcome::spawn_failed(&e);
                self.send(ServerMessage::Result(PlaybackResult::from(&outcome)));
                return;
            }
        };

        let supervisor = Arc::clone(&self.server.supervisor);
        let out = self.out.clone();
        tokio::spawn(async move {
            let (feedback_tx, mut feedback_rx) = mpsc::unbounded_channel();
            let feedback_out = out.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(feedback) = feedback_rx.recv().await {
                    if feedback_out.send(ServerMessage::from(feedback)).is_err() {
                        break;
                    }
                }
            });
            let outcome = supervisor.await_completion(&ticket, Some(&feedback_tx)).await;
            drop(feedback_tx);
            let _ = forwarder.await;
            let _ = out.send(ServerMessage::Result(PlaybackResult::from(&outcome)));
        });
    }

    fn subscribe(&mut self) {
        if self.volume_forwarder.is_some() {
            return;
        }
        let mut updates = self.server.telemetry.subscribe();
        // Latched: a new subscriber gets the last known level right away
        if let Some(percent) = self.server.telemetry.last_known() {
            self.send(ServerMessage::Volume { percent });
        }
        self.server.listener_joined();

        let out = self.out.clone();
        let id = self.id;
        self.volume_forwarder = Some(tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(percent) => {
                        if out.send(ServerMessage::Volume { percent }).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(target: LOG_TARGET, connection_id = %id, "Skipped {} volume updates.", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    fn unsubscribe(&mut self) {
        if let Some(forwarder) = self.volume_forwarder.take() {
            forwarder.abort();
            self.server.listener_left();
        }
    }
}
