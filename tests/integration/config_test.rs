//! Integration tests for configuration management
//!
//! These tests verify that the configuration system works correctly
//! across module boundaries.

use audio_file_player::config::Settings;
use audio_file_player::ui::Args;
use clap::Parser;
use std::error::Error;
use tempfile::tempdir;

#[cfg(test)]
mod config_integration_tests {
    use super::*;

    /// Test complete configuration workflow
    #[test]
    fn test_config_lifecycle() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");

        let mut settings = Settings::default();
        settings.command = "aplay".to_string();
        settings.flags = "-q".to_string();
        settings.listen_addr = "0.0.0.0:9191".to_string();

        settings.validate()?;
        settings.save(&config_path)?;

        let loaded_settings = Settings::load(&config_path)?;
        assert_eq!(loaded_settings.command, "aplay");
        assert_eq!(loaded_settings.flags, "-q");
        assert_eq!(loaded_settings.listen_socket_addr()?.port(), 9191);

        // Command-line values win over the file
        let args = Args::try_parse_from(["audio-file-player", "--feedback-rate", "25"])?;
        let mut merged = loaded_settings;
        args.apply_to(&mut merged);
        assert_eq!(merged.feedback_rate, 25.0);
        assert_eq!(merged.command, "aplay");
        merged.validate()?;

        Ok(())
    }

    /// Test invalid configuration handling
    #[test]
    fn test_invalid_config_validation() {
        let mut invalid_settings = Settings::default();
        invalid_settings.command = String::new();

        let result = invalid_settings.validate();
        assert!(result.is_err());

        if let Err(e) = result {
            assert!(e.to_string().contains("command cannot be empty"));
        }

        let mut negative_rate = Settings::default();
        negative_rate.feedback_rate = -1.0;
        assert!(negative_rate.validate().is_err());
    }
}
