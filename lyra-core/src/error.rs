use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - edit it if needed and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Track errors
    #[error("Invalid track file {path}: {reason}")]
    TrackInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// User-facing playback error recorded in [`PlaybackState`](crate::PlaybackState).
///
/// These never propagate out of the controller. Timeout and load failure are
/// kept apart so a UI can tell a slow network from a bad file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackError {
    /// The media engine refused or failed to start playback.
    #[error("Playback failed, please try again")]
    PlaybackFailed,

    /// The media resource could not be loaded.
    #[error("Unable to load the audio file, please check your network connection")]
    MediaLoadFailed,

    /// No metadata arrived within the configured load timeout.
    #[error("Loading timed out, please check your network connection or reload")]
    LoadTimeout,
}

/// Reasons a media engine can reject a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("media resource is not ready")]
    NotReady,

    #[error("autoplay was blocked by policy")]
    AutoplayBlocked,

    #[error("media resource has been released")]
    Released,
}
