//! Track descriptor supplied by the catalog.

use crate::error::{CoreError, Result};
use crate::lrc::LyricSet;
use crate::time::duration_from_secs_f64;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// A single playable track with optional time-coded lyrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Where the audio lives
    pub audio_url: Url,
    /// Album art, unused by the core
    #[serde(default)]
    pub cover_url: Option<Url>,
    /// Duration in seconds when known ahead of metadata
    #[serde(default)]
    pub duration: Option<f64>,
    /// Raw LRC text
    #[serde(default)]
    pub lyrics: Option<String>,
}

impl Track {
    /// Parse a track from a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or misses fields.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a track from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TrackInvalid`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |reason: String| CoreError::TrackInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Self::from_toml_str(&content).map_err(|e| invalid(e.to_string()))
    }

    /// Parse the attached lyrics; empty when the track has none
    #[must_use]
    pub fn parse_lyrics(&self) -> LyricSet {
        LyricSet::parse_opt(self.lyrics.as_deref())
    }

    /// Known duration, falling back to the lyric file's `[length:]` tag
    #[must_use]
    pub fn known_duration(&self, lyrics: &LyricSet) -> Option<Duration> {
        self.duration
            .map(duration_from_secs_f64)
            .filter(|d| !d.is_zero())
            .or(lyrics.metadata.length)
    }
}
