use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, trace, warn};

use super::outcome::{PlaybackFeedback, PlaybackOutcome};
use super::session::{build_command_line, sanitize_path, PlaybackSession, PlaybackTicket};
use crate::process::{ProcessError, ProcessHandle, ShutdownSignal};
use crate::volume::VolumeTelemetry;

const LOG_TARGET: &str = "audio_file_player::playback";

pub const DEFAULT_FEEDBACK_RATE: f64 = 10.0;

/// Snapshot of the supervisor slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackStatus {
    Idle,
    Playing { file_path: String, elapsed: StdDuration },
}

/// Owns the one active player process.
///
/// Every mutation of the active session goes through `slot`. A new playback
/// kills and reaps the previous process before spawning its own, so at most
/// one player is alive at any time.
pub struct PlaybackSupervisor {
    command: String,
    flags: String,
    feedback_period: StdDuration,
    slot: TokioMutex<Option<PlaybackSession>>,
    telemetry: Arc<VolumeTelemetry>,
    shutdown: ShutdownSignal,
}

impl PlaybackSupervisor {
    pub fn new(
        command: &str,
        flags: &str,
        feedback_rate: f64,
        telemetry: Arc<VolumeTelemetry>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let rate = if feedback_rate.is_finite() && feedback_rate > 0.0 {
            feedback_rate
        } else {
            warn!(target: LOG_TARGET, "Invalid feedback rate {}, using {} Hz.", feedback_rate, DEFAULT_FEEDBACK_RATE);
            DEFAULT_FEEDBACK_RATE
        };
        info!(target: LOG_TARGET, "Playing files with '{} {}' at {} Hz feedback.", command, flags, rate);
        PlaybackSupervisor {
            command: command.to_string(),
            flags: flags.to_string(),
            feedback_period: StdDuration::from_secs_f64(1.0 / rate),
            slot: TokioMutex::new(None),
            telemetry,
            shutdown,
        }
    }

    pub fn feedback_period(&self) -> StdDuration {
        self.feedback_period
    }

    /// Starts playing `file_path`, killing any playback still in progress.
    #[instrument(skip(self))]
    pub async fn start(&self, file_path: &str) -> Result<PlaybackTicket, ProcessError> {
        let file_path = sanitize_path(file_path);
        let command_line = build_command_line(&self.command, &self.flags, &file_path);

        let mut slot = self.slot.lock().await;
        // Held before the previous session releases its own, so the volume ticker keeps running
        let poll_hold = self.telemetry.hold_for_playback();
        if let Some(mut previous) = slot.take() {
            if !previous.process.is_done() {
                info!(target: LOG_TARGET, "Superseding playback of {}", previous.file_path);
                previous.process.kill().await;
            }
        }

        info!(target: LOG_TARGET, "Playing audio file: {} with command: {}", file_path, command_line);
        let started_at = Instant::now();
        let process = ProcessHandle::spawn(&command_line)?;
        let session = PlaybackSession::new(file_path, started_at, process, poll_hold);
        let ticket = session.ticket();
        *slot = Some(session);
        Ok(ticket)
    }

    /// Emits feedback every tick until the playback behind `ticket` ends, then
    /// reconciles its outcome.
    ///
    /// A cancellation request always wins over the exit status it caused.
    #[instrument(skip(self, ticket, feedback), fields(file_path = %ticket.file_path))]
    pub async fn await_completion(
        &self,
        ticket: &PlaybackTicket,
        feedback: Option<&mpsc::UnboundedSender<PlaybackFeedback>>,
    ) -> PlaybackOutcome {
        let mut ticks = interval(self.feedback_period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticks.tick() => {}
                _ = self.shutdown.wait() => {}
            }

            let mut slot = self.slot.lock().await;
            let finished = match slot.as_mut() {
                Some(session) if session.id == ticket.id => {
                    if self.shutdown.is_triggered() && !session.process.is_done() {
                        info!(target: LOG_TARGET, "Shutdown requested, stopping playback.");
                        session.process.kill().await;
                    }
                    session.cancel_requested || session.process.is_done()
                }
                _ => {
                    info!(target: LOG_TARGET, "Playback was superseded by a newer request.");
                    return PlaybackOutcome::Cancelled;
                }
            };

            if finished {
                if let Some(session) = slot.take() {
                    return reconcile(session);
                }
            }

            let update = PlaybackFeedback {
                elapsed: ticket.started_at.elapsed(),
            };
            trace!(target: LOG_TARGET, elapsed = update.elapsed_seconds(), "Playback feedback.");
            if let Some(tx) = feedback {
                if tx.send(update).is_err() {
                    trace!(target: LOG_TARGET, "Feedback receiver dropped.");
                }
            }
        }
    }

    /// Kills the active playback and marks it cancelled. Returns false when idle.
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> bool {
        let mut slot = self.slot.lock().await;
        match slot.as_mut() {
            Some(session) => {
                info!(target: LOG_TARGET, "Got a cancel request for {}", session.file_path);
                session.cancel_requested = true;
                session.process.kill().await;
                true
            }
            None => {
                debug!(target: LOG_TARGET, "Cancel requested while idle.");
                false
            }
        }
    }

    /// Last-request-wins playback without a waiting requester: the outcome is
    /// only logged.
    pub async fn play_now(self: &Arc<Self>, file_path: &str) -> Result<PlaybackTicket, ProcessError> {
        let ticket = self.start(file_path).await?;
        let supervisor = Arc::clone(self);
        let watched = ticket.clone();
        tokio::spawn(async move {
            match supervisor.await_completion(&watched, None).await {
                PlaybackOutcome::Succeeded { total_time } => {
                    info!(target: LOG_TARGET, "Finished {} in {:.2}s", watched.file_path, total_time.as_secs_f64())
                }
                PlaybackOutcome::Failed { reason } => {
                    error!(target: LOG_TARGET, "Playback of {} failed: {}", watched.file_path, reason)
                }
                PlaybackOutcome::Cancelled => {
                    info!(target: LOG_TARGET, "Playback of {} cancelled.", watched.file_path)
                }
            }
        });
        Ok(ticket)
    }

    pub async fn status(&self) -> PlaybackStatus {
        let mut slot = self.slot.lock().await;
        match slot.as_mut() {
            Some(session) => {
                if session.process.is_done() {
                    PlaybackStatus::Idle
                } else {
                    PlaybackStatus::Playing {
                        file_path: session.file_path.clone(),
                        elapsed: session.started_at.elapsed(),
                    }
                }
            }
            None => PlaybackStatus::Idle,
        }
    }

    /// Kills and releases any active playback.
    pub async fn stop_all(&self) {
        if let Some(mut session) = self.slot.lock().await.take() {
            info!(target: LOG_TARGET, "Stopping playback of {} for shutdown.", session.file_path);
            session.process.kill().await;
        }
    }
}

fn reconcile(mut session: PlaybackSession) -> PlaybackOutcome {
    let total_time = session.started_at.elapsed();
    if session.cancel_requested {
        info!(target: LOG_TARGET, "Cancel requested.");
        return PlaybackOutcome::Cancelled;
    }
    if session.process.is_succeeded() {
        info!(target: LOG_TARGET, "Played {} in {:.2}s", session.file_path, total_time.as_secs_f64());
        PlaybackOutcome::Succeeded { total_time }
    } else {
        let reason = format!(
            "stderr: {}\nstdout: {}",
            session.process.stderr_text(),
            session.process.stdout_text()
        );
        error!(target: LOG_TARGET, state = ?session.process.poll(), "Playback of {} failed.", session.file_path);
        PlaybackOutcome::Failed { reason }
    }
}
