//! Playback supervision: one external player process at a time

mod outcome;
mod session;
mod supervisor;

pub use outcome::{PlaybackFeedback, PlaybackOutcome, PlaybackResult};
pub use session::{build_command_line, sanitize_path, PlaybackTicket};
pub use supervisor::{PlaybackStatus, PlaybackSupervisor, DEFAULT_FEEDBACK_RATE};
