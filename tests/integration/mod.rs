//! Integration tests module
//!
//! This module organizes all integration tests for the audio-file-player service.

pub mod config_test;
pub mod playback_test;
pub mod server_test;
