use std::time::Instant;
use uuid::Uuid;

use crate::process::ProcessHandle;
use crate::volume::PlaybackPollHold;

/// Removes the quote characters that could break out of the quoted path argument.
pub fn sanitize_path(path: &str) -> String {
    path.replace(['\'', '"'], "")
}

/// `<command> <flags> '<path>'`; `path` must already be sanitized.
pub fn build_command_line(command: &str, flags: &str, path: &str) -> String {
    format!("{} {} '{}'", command, flags, path)
}

/// Identifies one playback to the flow awaiting its completion.
#[derive(Debug, Clone)]
pub struct PlaybackTicket {
    pub id: Uuid,
    pub file_path: String,
    pub started_at: Instant,
}

/// The single in-flight playback, owned by the supervisor slot.
#[derive(Debug)]
pub(super) struct PlaybackSession {
    pub(super) id: Uuid,
    pub(super) file_path: String,
    pub(super) started_at: Instant,
    pub(super) process: ProcessHandle,
    pub(super) cancel_requested: bool,
    // Keeps the volume ticker running while this session lives
    pub(super) _poll_hold: PlaybackPollHold,
}

impl PlaybackSession {
    pub(super) fn new(
        file_path: String,
        started_at: Instant,
        process: ProcessHandle,
        poll_hold: PlaybackPollHold,
    ) -> Self {
        PlaybackSession {
            id: Uuid::new_v4(),
            file_path,
            started_at,
            process,
            cancel_requested: false,
            _poll_hold: poll_hold,
        }
    }

    pub(super) fn ticket(&self) -> PlaybackTicket {
        PlaybackTicket {
            id: self.id,
            file_path: self.file_path.clone(),
            started_at: self.started_at,
        }
    }
}
