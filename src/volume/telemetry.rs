use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration as StdDuration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::controller::VolumeController;
use super::error::VolumeError;
use super::gate::{GateTransition, SubscriptionGate};
use super::state::VolumeState;

const LOG_TARGET: &str = "audio_file_player::volume::telemetry";

#[derive(Debug, Default)]
struct PollTicker {
    listeners: bool,
    playback_holds: usize,
    task: Option<JoinHandle<()>>,
}

impl PollTicker {
    fn wanted(&self) -> bool {
        self.listeners || self.playback_holds > 0
    }
}

/// Latched volume publisher with a single shared poll ticker.
///
/// The ticker runs while any listener is subscribed or any playback holds it,
/// and there is never more than one ticker task.
#[derive(Debug)]
pub struct VolumeTelemetry {
    me: Weak<VolumeTelemetry>,
    controller: VolumeController,
    state: VolumeState,
    updates: broadcast::Sender<u8>,
    gate: Mutex<SubscriptionGate>,
    ticker: Mutex<PollTicker>,
    poll_interval: StdDuration,
}

impl VolumeTelemetry {
    pub fn new(controller: VolumeController, poll_interval: StdDuration) -> Arc<Self> {
        let (updates, _) = broadcast::channel(16);
        Arc::new_cyclic(|me| VolumeTelemetry {
            me: me.clone(),
            controller,
            state: VolumeState::new(),
            updates,
            gate: Mutex::new(SubscriptionGate::new()),
            ticker: Mutex::new(PollTicker::default()),
            poll_interval,
        })
    }

    pub fn controller(&self) -> &VolumeController {
        &self.controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<u8> {
        self.updates.subscribe()
    }

    pub fn last_known(&self) -> Option<u8> {
        self.state.last_known()
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.ticker).task.is_some()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.gate).listeners()
    }

    /// Reads the mixer, records and publishes the level.
    ///
    /// A failed read is logged and leaves the last known value untouched.
    pub async fn refresh(&self) -> Option<u8> {
        match self.controller.get_volume().await {
            Ok(percent) => {
                let percent = self.state.record(percent.into());
                self.publish(percent);
                Some(percent)
            }
            Err(VolumeError::Interrupted(cmd)) => {
                debug!(target: LOG_TARGET, "Volume read interrupted: {}", cmd);
                None
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Volume unknown: {}", e);
                None
            }
        }
    }

    /// Applies a new level, then publishes a fresh reading.
    pub async fn set_volume(&self, requested: i64) -> Result<u8, VolumeError> {
        let applied = self.controller.set_volume(requested).await?;
        self.refresh().await;
        Ok(applied)
    }

    pub fn listener_joined(&self) {
        let transition = lock(&self.gate).on_listener_join();
        self.apply(transition);
    }

    pub fn listener_left(&self, new_count: usize) {
        let transition = lock(&self.gate).on_listener_leave(new_count);
        self.apply(transition);
    }

    /// Keeps the ticker running until the returned guard is dropped.
    pub fn hold_for_playback(&self) -> PlaybackPollHold {
        {
            let mut ticker = lock(&self.ticker);
            ticker.playback_holds += 1;
            self.reconcile(&mut ticker);
        }
        PlaybackPollHold {
            telemetry: self.me.clone(),
        }
    }

    /// Stops the ticker regardless of holders.
    pub fn stop_polling(&self) {
        let mut ticker = lock(&self.ticker);
        if let Some(task) = ticker.task.take() {
            info!(target: LOG_TARGET, "Stopping volume poll ticker for shutdown.");
            task.abort();
        }
    }

    fn release_playback(&self) {
        let mut ticker = lock(&self.ticker);
        ticker.playback_holds = ticker.playback_holds.saturating_sub(1);
        self.reconcile(&mut ticker);
    }

    fn apply(&self, transition: Option<GateTransition>) {
        let Some(transition) = transition else {
            return;
        };
        let mut ticker = lock(&self.ticker);
        match transition {
            GateTransition::EnablePolling => {
                info!(target: LOG_TARGET, "Enable audio volume subscription service.");
                ticker.listeners = true;
            }
            GateTransition::DisablePolling => {
                info!(target: LOG_TARGET, "Disable audio volume subscription service.");
                ticker.listeners = false;
            }
        }
        self.reconcile(&mut ticker);
    }

    fn reconcile(&self, ticker: &mut PollTicker) {
        match (ticker.wanted(), ticker.task.is_some()) {
            (true, false) => {
                debug!(target: LOG_TARGET, "Starting volume poll ticker every {:?}.", self.poll_interval);
                ticker.task = Some(spawn_ticker(self.me.clone(), self.poll_interval));
            }
            (false, true) => {
                debug!(target: LOG_TARGET, "Stopping volume poll ticker.");
                if let Some(task) = ticker.task.take() {
                    task.abort();
                }
            }
            _ => {}
        }
    }

    fn publish(&self, percent: u8) {
        trace!(target: LOG_TARGET, "Publishing volume {}%", percent);
        if self.updates.send(percent).is_err() {
            trace!(target: LOG_TARGET, "No active listeners for volume update.");
        }
    }
}

fn spawn_ticker(telemetry: Weak<VolumeTelemetry>, period: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let Some(telemetry) = telemetry.upgrade() else {
                break;
            };
            telemetry.refresh().await;
        }
    })
}

/// Guard returned by [`VolumeTelemetry::hold_for_playback`].
#[derive(Debug)]
pub struct PlaybackPollHold {
    telemetry: Weak<VolumeTelemetry>,
}

impl Drop for PlaybackPollHold {
    fn drop(&mut self) {
        if let Some(telemetry) = self.telemetry.upgrade() {
            telemetry.release_playback();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
