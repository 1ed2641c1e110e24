//! WebSocket control surface for playback and volume requests

mod connection;
mod error;
mod messages;

pub use error::ServerError;
pub use messages::{ClientMessage, ServerMessage};

use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::playback::PlaybackSupervisor;
use crate::process::ShutdownSignal;
use crate::volume::VolumeTelemetry;

const LOG_TARGET: &str = "audio_file_player::server";

/// Accepts control connections and routes their requests.
pub struct ControlServer {
    supervisor: Arc<PlaybackSupervisor>,
    telemetry: Arc<VolumeTelemetry>,
    shutdown: ShutdownSignal,
    // Volume subscribers across all connections
    listeners: Mutex<usize>,
}

impl ControlServer {
    pub fn new(
        supervisor: Arc<PlaybackSupervisor>,
        telemetry: Arc<VolumeTelemetry>,
        shutdown: ShutdownSignal,
    ) -> Arc<Self> {
        Arc::new(ControlServer {
            supervisor,
            telemetry,
            shutdown,
            listeners: Mutex::new(0),
        })
    }

    /// Serves connections from `listener` until shutdown is requested.
    #[instrument(skip(self, listener))]
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> Result<(), ServerError> {
        info!(target: LOG_TARGET, "Control server listening on {}", listener.local_addr()?);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = connection::handle_connection(server, stream, peer).await {
                            error!(target: LOG_TARGET, %peer, "Connection ended with error: {}", e);
                        }
                    });
                }
                _ = self.shutdown.wait() => {
                    info!(target: LOG_TARGET, "Control server shutting down.");
                    return Ok(());
                }
            }
        }
    }

    fn listener_joined(&self) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        *listeners += 1;
        self.telemetry.listener_joined();
    }

    fn listener_left(&self) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        *listeners = listeners.saturating_sub(1);
        self.telemetry.listener_left(*listeners);
    }
}
