use tracing::debug;

const LOG_TARGET: &str = "audio_file_player::volume::gate";

/// Transition the owner must apply to its polling timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    EnablePolling,
    DisablePolling,
}

/// Listener reference count deciding whether volume telemetry is polled.
///
/// Polling is enabled iff the count is above zero. Each crossing of zero
/// yields exactly one transition; repeated joins or leaves that do not cross
/// zero yield nothing.
#[derive(Debug, Default)]
pub struct SubscriptionGate {
    listeners: usize,
    enabled: bool,
}

impl SubscriptionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_listener_join(&mut self) -> Option<GateTransition> {
        self.listeners += 1;
        debug!(target: LOG_TARGET, listeners = self.listeners, "Listener joined.");
        self.reconcile()
    }

    /// `new_count` is the listener count reported by the transport after the leave.
    pub fn on_listener_leave(&mut self, new_count: usize) -> Option<GateTransition> {
        self.listeners = new_count;
        debug!(target: LOG_TARGET, listeners = self.listeners, "Listener left.");
        self.reconcile()
    }

    pub fn listeners(&self) -> usize {
        self.listeners
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn reconcile(&mut self) -> Option<GateTransition> {
        match (self.listeners > 0, self.enabled) {
            (true, false) => {
                self.enabled = true;
                Some(GateTransition::EnablePolling)
            }
            (false, true) => {
                self.enabled = false;
                Some(GateTransition::DisablePolling)
            }
            _ => None,
        }
    }
}
