//! Terminal rendering of the lyric window.

use lyra_core::{format_clock, LyricSet, PlaybackState};
use std::fmt::Write;
use std::time::Duration;

const ACTIVE_MARKER: &str = "> ";
const INACTIVE_MARKER: &str = "  ";

/// Render the lines around `position`, marking the active one.
///
/// Translations are printed indented under their line.
pub fn render_window(lyrics: &LyricSet, position: Duration, before: usize, after: usize) -> String {
    let active = lyrics.active_line(position);
    let mut out = String::new();

    for line in lyrics.visible_lines(position, before, after) {
        let marker = if active.is_some_and(|a| std::ptr::eq(a, line)) {
            ACTIVE_MARKER
        } else {
            INACTIVE_MARKER
        };
        let _ = writeln!(out, "{marker}{}", line.text);
        if let Some(translation) = &line.translation {
            let _ = writeln!(out, "{INACTIVE_MARKER}  {translation}");
        }
    }

    out
}

/// `m:ss / m:ss` progress label, with `--:--` while the duration is unknown
pub fn progress_label(state: &PlaybackState) -> String {
    let total = if state.duration.is_zero() {
        "--:--".to_string()
    } else {
        format_clock(state.duration)
    };
    format!("{} / {total}", format_clock(state.current_time))
}
