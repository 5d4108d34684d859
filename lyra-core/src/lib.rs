pub mod config;
pub mod error;
pub mod lrc;
pub mod media;
pub mod paths;
pub mod playback;
pub mod preload;
pub mod sync;
pub mod time;
pub mod track;

pub use config::{LoggingConfig, LyraConfig, LyricsConfig, PlaybackConfig};
pub use error::{CoreError, MediaError, PlaybackError};
pub use lrc::{LyricLine, LyricMetadata, LyricSet};
pub use media::{MediaEvent, MediaResource, SimulatedMedia, SimulatedMediaOptions};
pub use paths::{config_dir, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use playback::{PlaybackController, PlaybackState};
pub use preload::PreloadState;
pub use sync::{SyncEngine, SyncEvent};
pub use time::{duration_from_secs_f64, format_clock, DurationExt};
pub use track::Track;
