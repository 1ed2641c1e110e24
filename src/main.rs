use audio_file_player::config::Settings;
use audio_file_player::playback::PlaybackSupervisor;
use audio_file_player::process::ShutdownSignal;
use audio_file_player::server::ControlServer;
use audio_file_player::ui::Args;
use audio_file_player::volume::{VolumeController, VolumeTelemetry};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "audio_file_player=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log_json);

    // Load configuration from file or use defaults, then apply CLI/env overrides
    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&config_path)?;
    args.apply_to(&mut settings);
    settings.validate()?;

    info!("Initializing audio file player...");
    let shutdown = ShutdownSignal::new();

    let controller = VolumeController::new(
        &settings.volume_get_command,
        &settings.volume_set_command,
        shutdown.clone(),
    );
    let telemetry = VolumeTelemetry::new(
        controller,
        StdDuration::from_secs_f64(settings.volume_poll_interval_secs),
    );
    // Populate the latched value for the first subscriber
    if telemetry.refresh().await.is_none() {
        warn!("Initial volume could not be read; publishing once the mixer answers.");
    }

    let supervisor = Arc::new(PlaybackSupervisor::new(
        &settings.command,
        &settings.flags,
        settings.feedback_rate,
        Arc::clone(&telemetry),
        shutdown.clone(),
    ));

    let listener = TcpListener::bind(settings.listen_socket_addr()?).await?;
    info!("Done, accepting play requests on ws://{}", listener.local_addr()?);
    let server = ControlServer::new(Arc::clone(&supervisor), Arc::clone(&telemetry), shutdown.clone());
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, stopping playback.");
                ctrl_c_shutdown.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    // Returns once shutdown is triggered, or early if accepting fails
    let server_result = server.run(listener).await;
    shutdown.trigger();
    supervisor.stop_all().await;
    telemetry.stop_polling();

    match server_result {
        Ok(()) => info!("Control server stopped."),
        Err(e) => error!("Control server failed: {}", e),
    }
    Ok(())
}
