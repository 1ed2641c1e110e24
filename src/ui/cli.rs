//! Command-line interface implementation

use clap::Parser;

use crate::config::Settings;

/// Command-line arguments for audio-file-player
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Remote-controlled audio file player", long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, env = "AUDIO_FILE_PLAYER_CONFIG")]
    pub config: Option<String>,

    /// Player command used to play files
    #[arg(long, env = "AUDIO_FILE_PLAYER_COMMAND")]
    pub command: Option<String>,

    /// Flags passed to the player before the file path
    #[arg(long, env = "AUDIO_FILE_PLAYER_FLAGS", allow_hyphen_values = true)]
    pub flags: Option<String>,

    /// Playback feedback rate in Hz
    #[arg(long, env = "AUDIO_FILE_PLAYER_FEEDBACK_RATE")]
    pub feedback_rate: Option<f64>,

    /// Mixer command printing the current volume
    #[arg(long, env = "AUDIO_FILE_PLAYER_VOLUME_GET")]
    pub volume_get_command: Option<String>,

    /// Mixer command prefix used to set the volume
    #[arg(long, env = "AUDIO_FILE_PLAYER_VOLUME_SET")]
    pub volume_set_command: Option<String>,

    /// Address for the WebSocket control server
    #[arg(short, long, env = "AUDIO_FILE_PLAYER_LISTEN")]
    pub listen_addr: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    pub log_json: bool,
}

impl Args {
    /// Command-line values take precedence over the config file.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(command) = &self.command {
            settings.command = command.clone();
        }
        if let Some(flags) = &self.flags {
            settings.flags = flags.clone();
        }
        if let Some(rate) = self.feedback_rate {
            settings.feedback_rate = rate;
        }
        if let Some(get) = &self.volume_get_command {
            settings.volume_get_command = get.clone();
        }
        if let Some(set) = &self.volume_set_command {
            settings.volume_set_command = set.clone();
        }
        if let Some(addr) = &self.listen_addr {
            settings.listen_addr = addr.clone();
        }
    }
}
