use serde::{Deserialize, Serialize};

use crate::playback::{PlaybackFeedback, PlaybackResult};

/// Requests accepted from a control connection, one JSON text frame each.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Play and report feedback plus a final result to this connection.
    Play {
        #[serde(rename = "filePath")]
        file_path: String,
    },
    Cancel,
    /// Fire-and-forget playback.
    PlayNow {
        #[serde(rename = "filePath")]
        file_path: String,
    },
    SetVolume {
        percent: i8,
    },
    GetVolume,
    SubscribeVolume,
    UnsubscribeVolume,
}

/// Messages pushed to a control connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    Feedback {
        #[serde(rename = "elapsedSeconds")]
        elapsed_seconds: f64,
    },
    Result(PlaybackResult),
    Volume {
        percent: u8,
    },
    Error {
        message: String,
    },
}

impl From<PlaybackFeedback> for ServerMessage {
    fn from(feedback: PlaybackFeedback) -> Self {
        ServerMessage::Feedback {
            elapsed_seconds: feedback.elapsed_seconds(),
        }
    }
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
