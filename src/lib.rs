//! audio-file-player library core functionality

pub mod config;
pub mod playback;
pub mod process;
pub mod server;
pub mod ui;
pub mod volume;
