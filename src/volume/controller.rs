use std::time::Duration as StdDuration;

use tracing::{debug, info, instrument};

use super::error::VolumeError;
use super::state::clamp_percent;
use crate::process::{ProcessHandle, ShutdownSignal};

const LOG_TARGET: &str = "audio_file_player::volume::controller";

/// Sleep between completion checks while a mixer command runs.
pub const COMMAND_POLL_INTERVAL: StdDuration = StdDuration::from_millis(100);

/// Runs the configured mixer get/set commands.
#[derive(Debug, Clone)]
pub struct VolumeController {
    get_command: String,
    set_command: String,
    shutdown: ShutdownSignal,
}

impl VolumeController {
    pub fn new(get_command: &str, set_command: &str, shutdown: ShutdownSignal) -> Self {
        info!(target: LOG_TARGET, "Volume get command: '{}'", get_command);
        info!(target: LOG_TARGET, "Volume set command: '{}'", set_command);
        Self {
            get_command: get_command.to_string(),
            set_command: set_command.to_string(),
            shutdown,
        }
    }

    /// Full command line used to apply `percent`.
    pub fn set_command_line(&self, percent: u8) -> String {
        format!("{} {}%", self.set_command, percent)
    }

    /// Queries the mixer and parses the first percentage in its output.
    #[instrument(skip(self))]
    pub async fn get_volume(&self) -> Result<u8, VolumeError> {
        let handle = self.run(&self.get_command).await?;
        let output = handle.stdout_text();
        debug!(target: LOG_TARGET, "Volume get command output: {}", output);
        parse_percentage(&output).map(|raw| clamp_percent(raw.into()))
    }

    /// Clamps `requested` to 0..=100, applies it and returns the applied value.
    ///
    /// The mixer's exit status is logged but not treated as an error.
    #[instrument(skip(self))]
    pub async fn set_volume(&self, requested: i64) -> Result<u8, VolumeError> {
        let percent = clamp_percent(requested);
        info!(target: LOG_TARGET, "Changing volume to: {}%", percent);
        let mut handle = self.run(&self.set_command_line(percent)).await?;
        debug!(
            target: LOG_TARGET,
            succeeded = handle.is_succeeded(),
            "Volume set command output: {}",
            handle.stdout_text()
        );
        Ok(percent)
    }

    /// Spawns `command_line` and sleeps until it exits or shutdown is requested.
    async fn run(&self, command_line: &str) -> Result<ProcessHandle, VolumeError> {
        let mut handle = ProcessHandle::spawn(command_line)?;
        while !handle.is_done() {
            if self.shutdown.is_triggered() {
                handle.kill().await;
                return Err(VolumeError::Interrupted(command_line.to_string()));
            }
            tokio::time::sleep(COMMAND_POLL_INTERVAL).await;
        }
        Ok(handle)
    }
}

/// Extracts the level from mixer text such as `Mono: Playback 44 [51%] [-32.25dB] [on]`.
///
/// Takes at most three characters before the first `%`, drops `[` and
/// surrounding whitespace, and parses what remains.
pub fn parse_percentage(output: &str) -> Result<u16, VolumeError> {
    let pct_idx = output
        .find('%')
        .ok_or_else(|| VolumeError::Parse("no '%' in output".to_string()))?;
    let before = &output[..pct_idx];
    let start = before
        .char_indices()
        .rev()
        .nth(2)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let token = before[start..].replace('[', "");
    let token = token.trim();
    token
        .parse::<u16>()
        .map_err(|_| VolumeError::Parse(format!("'{}' is not a percentage", token)))
}
