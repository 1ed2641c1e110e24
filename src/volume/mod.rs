//! Mixer volume control and subscriber-gated volume telemetry

mod controller;
mod error;
mod gate;
mod state;
mod telemetry;

pub use controller::{parse_percentage, VolumeController, COMMAND_POLL_INTERVAL};
pub use error::VolumeError;
pub use gate::{GateTransition, SubscriptionGate};
pub use state::{clamp_percent, VolumeState};
pub use telemetry::{PlaybackPollHold, VolumeTelemetry};
