mod args;
mod display;

use crate::args::CliArgs;
use clap::Parser;
use lyra_core::{
    CoreError, LyraConfig, LyricsConfig, MediaEvent, MediaResource, PlaybackController,
    PlaybackState, PreloadState, SimulatedMedia, SimulatedMediaOptions, SyncEngine, SyncEvent,
    Track,
};
use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    let config = match LyraConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            // First run: the template matches the defaults
            info!("Created config template at {}", path.display());
            LyraConfig::default()
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    match runtime.block_on(play_track(&args, &config, cancel_token)) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Play one track to the end, printing the lyric window as it advances
async fn play_track(
    args: &CliArgs,
    config: &LyraConfig,
    cancel_token: CancellationToken,
) -> Result<ExitCode, CoreError> {
    let track = Track::load(&args.track_path)?;
    let lyrics = track.parse_lyrics();
    let duration = track.known_duration(&lyrics);

    println!("{} - {}", track.artist, track.title);

    let media = SimulatedMedia::new(
        track.audio_url.clone(),
        duration,
        SimulatedMediaOptions {
            tick: config.playback.time_update_interval(),
            ..SimulatedMediaOptions::default()
        },
    );
    let controller = PlaybackController::spawn(media.clone(), &config.playback);
    let mut media_events = media.subscribe();
    let mut state_rx = controller.subscribe();

    let sync_engine = SyncEngine::new();
    let printer = tokio::spawn(print_sync_events(
        sync_engine.subscribe(),
        controller.subscribe(),
        config.lyrics.clone(),
    ));
    sync_engine.set_lyrics(lyrics).await;
    let sync_handle = Arc::clone(&sync_engine).start(controller.subscribe(), cancel_token.clone());
    let preload_handle = tokio::spawn(track_preload(media.subscribe(), cancel_token.clone()));

    let _loader = media.load();

    let loaded = tokio::select! {
        () = cancel_token.cancelled() => None,
        loaded = state_rx.wait_for(|state| !state.is_loading) => Some(loaded.map(|state| state.error)),
    };

    let code = match loaded {
        None => ExitCode::SUCCESS,
        Some(Ok(None)) => {
            start_playback(&controller, args).await;
            wait_for_end(&controller, &mut media_events, &mut state_rx, &cancel_token).await
        }
        Some(Ok(Some(e))) => {
            error!("{e}");
            ExitCode::FAILURE
        }
        Some(Err(_)) => ExitCode::FAILURE,
    };

    controller.dispose().await;
    cancel_token.cancel();
    let _ = sync_handle.await;
    let _ = preload_handle.await;
    // The printer stops once the sync engine is gone
    drop(sync_engine);
    let _ = printer.await;

    Ok(code)
}

async fn start_playback(controller: &PlaybackController, args: &CliArgs) {
    if let Some(volume) = args.volume {
        controller.set_volume(volume);
    }
    if let Some(start) = args.start {
        controller.seek(start);
    }
    controller.play().await;
}

/// Wait until the track ends, fails or the user interrupts
async fn wait_for_end(
    controller: &PlaybackController,
    media_events: &mut broadcast::Receiver<MediaEvent>,
    state_rx: &mut watch::Receiver<PlaybackState>,
    cancel_token: &CancellationToken,
) -> ExitCode {
    if let Some(e) = controller.snapshot().error {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => return ExitCode::SUCCESS,
            event = media_events.recv() => match event {
                Ok(MediaEvent::Ended) => {
                    info!("Playback finished");
                    return ExitCode::SUCCESS;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Missed {} media events", n);
                }
                Err(broadcast::error::RecvError::Closed) => return ExitCode::SUCCESS,
            },
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return ExitCode::SUCCESS;
                }
                if let Some(e) = state_rx.borrow_and_update().error {
                    error!("{e}");
                    return ExitCode::FAILURE;
                }
            }
        }
    }
}

/// Print the lyric window every time the active line moves
async fn print_sync_events(
    mut rx: broadcast::Receiver<SyncEvent>,
    state_rx: watch::Receiver<PlaybackState>,
    layout: LyricsConfig,
) {
    let mut lyrics = None;

    loop {
        match rx.recv().await {
            Ok(event) => match event {
                SyncEvent::LyricsLoaded { lyrics: loaded } => {
                    let translated = if loaded.has_translations() {
                        " with translations"
                    } else {
                        ""
                    };
                    info!("Lyrics loaded: {} lines{translated}", loaded.len());
                    lyrics = Some(loaded);
                }
                SyncEvent::LyricsNotFound => {
                    println!("(no lyrics for this track)");
                    lyrics = None;
                }
                SyncEvent::ActiveLineChanged { .. } => {
                    let Some(lyrics) = &lyrics else { continue };
                    let state = state_rx.borrow().clone();
                    println!("\n[{}]", display::progress_label(&state));
                    print!(
                        "{}",
                        display::render_window(
                            lyrics,
                            state.current_time,
                            layout.lines_before,
                            layout.lines_after,
                        )
                    );
                }
                SyncEvent::Error { error } => {
                    warn!("Playback error: {}", error);
                }
            },
            Err(broadcast::error::RecvError::Closed) => {
                info!("Sync event channel closed");
                break;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} sync events", n);
            }
        }
    }
}

/// Log preload milestones from the media events
async fn track_preload(mut rx: broadcast::Receiver<MediaEvent>, cancel_token: CancellationToken) {
    let mut preload = PreloadState::default();

    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => break,
            event = rx.recv() => event,
        };

        match event {
            Ok(event) => {
                let before = preload.clone();
                preload.apply(&event);
                if preload != before {
                    match &preload.error {
                        Some(reason) => warn!("Preload failed: {}", reason),
                        None => info!("Preloaded {}%", preload.progress),
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Missed {} media events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled() -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let config_path = LyraConfig::config_path();
    let Ok(content) = std::fs::read_to_string(&config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Lyrics own stdout
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = lyra_core::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
