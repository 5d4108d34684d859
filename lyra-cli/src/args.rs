//! Command line arguments for the `lyra` binary.

use clap::Parser;
use std::path::PathBuf;

/// Play a track with synchronized, scrolling lyrics
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "lyra", version, about)]
pub struct CliArgs {
    /// Track descriptor (TOML) to play
    pub track_path: PathBuf,

    /// Position in seconds to start from once metadata is known
    #[arg(long, value_parser = parse_start, allow_negative_numbers = true)]
    pub start: Option<f64>,

    /// Playback volume, 0.0 to 1.0
    #[arg(long, value_parser = parse_volume, allow_negative_numbers = true)]
    pub volume: Option<f64>,
}

fn parse_finite(value: &str) -> Result<f64, String> {
    let number: f64 = value.parse().map_err(|_| format!("'{value}' is not a number"))?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err(format!("'{value}' must be finite"))
    }
}

fn parse_start(value: &str) -> Result<f64, String> {
    let secs = parse_finite(value)?;
    if secs < 0.0 {
        return Err(format!("'{value}' must not be negative"));
    }
    Ok(secs)
}

fn parse_volume(value: &str) -> Result<f64, String> {
    let volume = parse_finite(value)?;
    if !(0.0..=1.0).contains(&volume) {
        return Err(format!("'{value}' must be within 0..1"));
    }
    Ok(volume)
}
