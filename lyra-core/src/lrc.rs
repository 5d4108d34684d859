use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Parsed lyric file: ordered, immutable lines plus the informational ID tags.
///
/// Parsing is tolerant. Malformed lines are skipped, so an empty set means
/// "no lyrics available" rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricSet {
    pub metadata: LyricMetadata,
    pub lines: Vec<LyricLine>,
}

/// LRC metadata from ID tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub length: Option<Duration>,
    /// Milliseconds, can be negative. Recorded only; line times are not shifted.
    pub offset_ms: i64,
    /// Language of the first `[tr:<lang>]` tag seen, e.g. `zh-Hans`
    pub translation_language: Option<String>,
}

/// A single line of lyrics with timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    /// Instant from which this line is active
    pub time: Duration,
    /// Original-language text, trimmed and never empty
    pub text: String,
    /// Translation sharing the exact same timestamp
    pub translation: Option<String>,
}

/// One input line after tokenizing its bracket prefix.
enum RawLine<'a> {
    Tag { name: &'a str, value: &'a str },
    Lyric { times: Vec<Duration>, text: &'a str },
    Translation { times: Vec<Duration>, lang: &'a str, text: &'a str },
}

impl LyricSet {
    /// Parse LRC text into a `LyricSet`.
    ///
    /// Translation lines (`[mm:ss.xxx][tr:<lang>]text`) are paired with the
    /// lyric line carrying the identical timestamp regardless of which one
    /// comes first in the input.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let raw: Vec<RawLine<'_>> = input.lines().filter_map(tokenize_line).collect();

        let mut metadata = LyricMetadata::default();
        let mut translations: HashMap<Duration, &str> = HashMap::new();

        // First pass: ID tags and translations
        for line in &raw {
            match line {
                RawLine::Tag { name, value } => apply_id_tag(&mut metadata, name, value),
                RawLine::Translation { times, lang, text } => {
                    if metadata.translation_language.is_none() {
                        metadata.translation_language = Some((*lang).to_string());
                    }
                    for time in times {
                        translations.insert(*time, *text);
                    }
                }
                RawLine::Lyric { .. } => {}
            }
        }

        // Second pass: lyric lines
        let mut lines = Vec::new();
        for line in &raw {
            if let RawLine::Lyric { times, text } = line {
                for time in times {
                    lines.push(LyricLine {
                        time: *time,
                        text: (*text).to_string(),
                        translation: translations.get(time).map(|t| (*t).to_string()),
                    });
                }
            }
        }

        // Stable, so lines sharing a timestamp keep their input order
        lines.sort_by_key(|l| l.time);

        debug!(
            "Parsed {} lyric lines ({} translations)",
            lines.len(),
            translations.len()
        );

        Self { metadata, lines }
    }

    /// Parse optional LRC text; `None` yields an empty set.
    #[must_use]
    pub fn parse_opt(input: Option<&str>) -> Self {
        input.map(Self::parse).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether any line carries a translation
    #[must_use]
    pub fn has_translations(&self) -> bool {
        self.lines.iter().any(|l| l.translation.is_some())
    }

    /// Index of the last line whose time is at or before `position`.
    ///
    /// Returns `None` when `position` precedes every line or the set is empty.
    /// Lines are sorted, so this is a binary search and cheap enough to call
    /// on every time update.
    #[must_use]
    pub fn active_index(&self, position: Duration) -> Option<usize> {
        self.lines
            .partition_point(|line| line.time <= position)
            .checked_sub(1)
    }

    /// Find the current line for a given playback position
    #[must_use]
    pub fn active_line(&self, position: Duration) -> Option<&LyricLine> {
        self.active_index(position).map(|i| &self.lines[i])
    }

    /// Get lines around the current position for a scrolling display.
    ///
    /// Before the first line the window starts at the top of the lyrics.
    #[must_use]
    pub fn visible_lines(&self, position: Duration, before: usize, after: usize) -> &[LyricLine] {
        let current_idx = self.active_index(position).unwrap_or(0);

        let start = current_idx.saturating_sub(before).min(self.lines.len());
        let end = current_idx
            .saturating_add(after)
            .saturating_add(1)
            .min(self.lines.len());

        &self.lines[start..end]
    }
}

fn apply_id_tag(metadata: &mut LyricMetadata, name: &str, value: &str) {
    match name.to_ascii_lowercase().as_str() {
        "ti" => metadata.title = non_empty(value),
        "ar" => metadata.artist = non_empty(value),
        "al" => metadata.album = non_empty(value),
        "length" => metadata.length = parse_length_tag(value),
        "offset" => {
            if let Ok(offset) = value.parse::<i64>() {
                metadata.offset_ms = offset;
            }
        }
        _ => {} // Ignore unknown tags
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Classify one input line. Returns `None` for anything unusable.
fn tokenize_line(line: &str) -> Option<RawLine<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some((name, value)) = parse_id_tag(line) {
        return Some(RawLine::Tag { name, value });
    }

    let (times, rest) = split_timestamps(line)?;

    if let Some((lang, text)) = parse_translation_tag(rest) {
        let text = text.trim();
        // An empty translation is the same as no translation
        return (!text.is_empty()).then_some(RawLine::Translation { times, lang, text });
    }

    let text = rest.trim();
    if text.is_empty() {
        // Timestamp with no lyric, e.g. an instrumental gap marker
        return None;
    }

    Some(RawLine::Lyric { times, text })
}

/// Parse an ID tag like [ti:Title] or [ar:Artist]
fn parse_id_tag(line: &str) -> Option<(&str, &str)> {
    let content = line.strip_prefix('[')?;
    let end = content.find(']')?;
    let content = &content[..end];

    let (tag, value) = content.split_once(':')?;

    // If the tag part looks like a number, it's a timestamp, not an ID tag
    if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    // `[tr:...]` is only meaningful right after a timestamp
    if tag.eq_ignore_ascii_case("tr") {
        return None;
    }

    Some((tag.trim(), value.trim()))
}

/// Split leading timestamps off a line like [00:05.00][00:15.00]Repeated lyric
fn split_timestamps(line: &str) -> Option<(Vec<Duration>, &str)> {
    let mut remaining = line;
    let mut timestamps = Vec::new();

    while let Some(inner) = remaining.strip_prefix('[') {
        let Some(end) = inner.find(']') else {
            break;
        };
        let Some(time) = parse_timestamp(&inner[..end]) else {
            break;
        };
        timestamps.push(time);
        remaining = &inner[end + 1..];
    }

    if timestamps.is_empty() {
        None
    } else {
        Some((timestamps, remaining))
    }
}

/// Parse a `[tr:<lang>]` marker at the start of `rest`
fn parse_translation_tag(rest: &str) -> Option<(&str, &str)> {
    let inner = rest.strip_prefix('[')?;
    let end = inner.find(']')?;
    let (tag, lang) = inner[..end].split_once(':')?;
    if !tag.eq_ignore_ascii_case("tr") {
        return None;
    }
    Some((lang.trim(), &inner[end + 1..]))
}

/// Parse a timestamp string like "00:12.345", "00:12.34", "00:12" or "00:12:34".
///
/// The result is exact to the millisecond so that equal timestamps written
/// with different precision ("13.78" vs "13.780") compare equal.
fn parse_timestamp(s: &str) -> Option<Duration> {
    let parts: Vec<&str> = s.trim().split(':').collect();

    let (minutes, seconds, fraction) = match parts.as_slice() {
        [minutes, rest] => match rest.split_once('.') {
            Some((seconds, fraction)) => (*minutes, seconds, Some(fraction)),
            None => (*minutes, *rest, None),
        },
        // mm:ss:xx (hundredths written after a second colon)
        [minutes, seconds, fraction] => (*minutes, *seconds, Some(*fraction)),
        _ => return None,
    };

    let minutes = parse_digits(minutes)?;
    let seconds = parse_digits(seconds)?;
    let millis = match fraction {
        Some(fraction) => parse_fraction_millis(fraction)?,
        None => 0,
    };

    let total_ms = minutes
        .checked_mul(60_000)?
        .checked_add(seconds.checked_mul(1000)?)?
        .checked_add(millis)?;

    Some(Duration::from_millis(total_ms))
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Convert a decimal fraction ("7", "78", "780", "7801") to milliseconds.
fn parse_fraction_millis(fraction: &str) -> Option<u64> {
    if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut millis = 0;
    let mut digits = fraction.bytes().take(3).map(|b| u64::from(b - b'0'));
    for scale in [100, 10, 1] {
        millis += digits.next().unwrap_or(0) * scale;
    }
    Some(millis)
}

/// Parse a length tag given either as plain seconds ("232") or "mm:ss"
fn parse_length_tag(s: &str) -> Option<Duration> {
    if let Some(time) = parse_timestamp(s) {
        return Some(time);
    }
    let seconds: f64 = s.parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
