//! Background preload progress derived from media events.

use crate::media::MediaEvent;

/// How far a media resource has been fetched ahead of playback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadState {
    /// Percent loaded, 0-100
    pub progress: u8,
    /// The whole resource can play without stalling
    pub is_preloaded: bool,
    /// Preload failure message
    pub error: Option<String>,
}

impl PreloadState {
    /// Fold a media event into the preload progress.
    ///
    /// Milestones count as fixed steps (metadata 25%, playable 50%, fully
    /// buffered 100%); buffered-range reports give the exact percentage.
    pub fn apply(&mut self, event: &MediaEvent) {
        match event {
            MediaEvent::MetadataLoaded { .. } => self.progress = 25,
            MediaEvent::CanPlay => self.progress = 50,
            MediaEvent::CanPlayThrough => {
                self.progress = 100;
                self.is_preloaded = true;
            }
            MediaEvent::Progress { buffered, duration } => {
                if let Some(percent) = buffered_percent(*buffered, *duration) {
                    self.progress = percent;
                }
            }
            MediaEvent::LoadError { reason } => {
                self.error = Some(reason.clone());
                self.progress = 0;
            }
            MediaEvent::TimeUpdate { .. }
            | MediaEvent::Ended
            | MediaEvent::Waiting
            | MediaEvent::Playing => {}
        }
    }
}

fn buffered_percent(buffered: f64, duration: f64) -> Option<u8> {
    if !(duration.is_finite() && duration > 0.0 && buffered.is_finite()) {
        return None;
    }
    let percent = (buffered / duration * 100.0).round().clamp(0.0, 100.0);
    // Clamped to 0..=100 above
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = percent as u8;
    Some(percent)
}
