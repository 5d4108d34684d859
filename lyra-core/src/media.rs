//! Media resource abstraction and a clock-driven simulated engine.

use crate::error::MediaError;
use crate::time::{duration_from_secs_f64, DurationExt};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

const LOG_TARGET: &str = "lyra::media";

/// Lifecycle signals pushed by a media engine.
///
/// Positions and durations are in seconds, as media engines report them.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Duration is known
    MetadataLoaded { duration: f64 },
    /// Playback position advanced (or jumped after a seek)
    TimeUpdate { position: f64 },
    /// Playback reached the end of the resource
    Ended,
    /// The resource failed to load
    LoadError { reason: String },
    /// Playback stalled waiting for data
    Waiting,
    /// Enough data to start playing
    CanPlay,
    /// Enough data to play to the end without stalling
    CanPlayThrough,
    /// Playback started or resumed after a stall
    Playing,
    /// Buffering progress, `buffered` is the end of the last buffered range
    Progress { buffered: f64, duration: f64 },
}

/// Trait for the engine a [`PlaybackController`](crate::PlaybackController) drives.
///
/// Implementations push [`MediaEvent`]s at their own cadence through
/// [`subscribe`](MediaResource::subscribe). Dropping the receiver is the
/// unsubscribe.
#[async_trait]
pub trait MediaResource: Send + Sync {
    /// Location of the audio this resource plays
    fn source_url(&self) -> &Url;

    /// Start playback. The outcome may be deferred by the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not ready or refuses to play
    /// (for example an autoplay policy).
    async fn play(&self) -> Result<(), MediaError>;

    /// Pause playback
    fn pause(&self);

    /// Move the playback position, in seconds
    fn set_position(&self, secs: f64);

    /// Apply a volume in `[0, 1]`
    fn set_volume(&self, volume: f64);

    /// Subscribe to lifecycle events
    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;

    /// Release the underlying resource. Called once the owner is disposed.
    fn release(&self) {}
}

/// Tuning knobs for [`SimulatedMedia`]
#[derive(Debug, Clone)]
pub struct SimulatedMediaOptions {
    /// Cadence of `TimeUpdate` events while playing
    pub tick: Duration,
    /// Delay before metadata becomes available
    pub load_delay: Duration,
    /// Refuse `play()` as a browser autoplay policy would
    pub autoplay_blocked: bool,
}

impl Default for SimulatedMediaOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            load_delay: Duration::from_millis(100),
            autoplay_blocked: false,
        }
    }
}

/// Media engine that advances a virtual clock instead of decoding audio.
///
/// Used by the CLI and in tests. Time advances only while playing, in steps
/// of `options.tick`, and `Ended` is emitted once the clock reaches the
/// duration.
pub struct SimulatedMedia {
    url: Url,
    duration: Option<Duration>,
    options: SimulatedMediaOptions,
    loaded: AtomicBool,
    playing: AtomicBool,
    position_ms: AtomicU64,
    volume_bits: AtomicU64,
    event_tx: broadcast::Sender<MediaEvent>,
    cancel_token: CancellationToken,
}

impl SimulatedMedia {
    /// Create a simulated resource. A missing or zero duration makes the
    /// load fail, like an unreadable file would.
    #[must_use]
    pub fn new(url: Url, duration: Option<Duration>, mut options: SimulatedMediaOptions) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        // A zero period would make the ticker panic
        options.tick = options.tick.max(Duration::from_millis(1));

        Arc::new(Self {
            url,
            duration,
            options,
            loaded: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            position_ms: AtomicU64::new(0),
            volume_bits: AtomicU64::new(1.0_f64.to_bits()),
            event_tx,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Start loading in a background task that then drives the clock
    #[must_use]
    pub fn load(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let media = Arc::clone(self);
        tokio::spawn(async move {
            media.run().await;
        })
    }

    /// Current clock position
    #[must_use]
    pub fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn volume(&self) -> f64 {
        f64::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    fn emit(&self, event: MediaEvent) {
        // No receivers is fine, events are fire-and-forget
        let _ = self.event_tx.send(event);
    }

    async fn run(&self) {
        tokio::select! {
            () = self.cancel_token.cancelled() => return,
            () = sleep(self.options.load_delay) => {}
        }

        let Some(duration) = self.duration.filter(|d| !d.is_zero()) else {
            warn!(target: LOG_TARGET, "No playable duration for {}", self.url);
            self.emit(MediaEvent::LoadError {
                reason: format!("unable to read {}", self.url),
            });
            return;
        };

        self.loaded.store(true, Ordering::Relaxed);
        let duration_secs = duration.as_secs_f64();
        info!(target: LOG_TARGET, "Loaded {} ({:.1}s)", self.url, duration_secs);
        self.emit(MediaEvent::MetadataLoaded {
            duration: duration_secs,
        });
        self.emit(MediaEvent::Progress {
            buffered: duration_secs,
            duration: duration_secs,
        });
        self.emit(MediaEvent::CanPlay);
        self.emit(MediaEvent::CanPlayThrough);

        let mut ticker = interval_at(Instant::now() + self.options.tick, self.options.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(target: LOG_TARGET, "Clock stopped for {}", self.url);
                    break;
                }
                _ = ticker.tick() => self.advance(duration),
            }
        }
    }

    fn advance(&self, duration: Duration) {
        if !self.is_playing() {
            return;
        }

        let next = self.position().saturating_add(self.options.tick);
        if next >= duration {
            self.position_ms
                .store(duration.as_millis_u64(), Ordering::Relaxed);
            self.playing.store(false, Ordering::Relaxed);
            self.emit(MediaEvent::TimeUpdate {
                position: duration.as_secs_f64(),
            });
            self.emit(MediaEvent::Ended);
        } else {
            self.position_ms.store(next.as_millis_u64(), Ordering::Relaxed);
            self.emit(MediaEvent::TimeUpdate {
                position: next.as_secs_f64(),
            });
        }
    }
}

#[async_trait]
impl MediaResource for SimulatedMedia {
    fn source_url(&self) -> &Url {
        &self.url
    }

    async fn play(&self) -> Result<(), MediaError> {
        if self.cancel_token.is_cancelled() {
            return Err(MediaError::Released);
        }
        if !self.loaded.load(Ordering::Relaxed) {
            return Err(MediaError::NotReady);
        }
        if self.options.autoplay_blocked {
            return Err(MediaError::AutoplayBlocked);
        }

        self.playing.store(true, Ordering::Relaxed);
        self.emit(MediaEvent::Playing);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::Relaxed);
    }

    fn set_position(&self, secs: f64) {
        let mut position = duration_from_secs_f64(secs);
        if let Some(duration) = self.duration {
            position = position.min(duration);
        }
        self.position_ms
            .store(position.as_millis_u64(), Ordering::Relaxed);
        self.emit(MediaEvent::TimeUpdate {
            position: position.as_secs_f64(),
        });
    }

    fn set_volume(&self, volume: f64) {
        self.volume_bits
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.event_tx.subscribe()
    }

    fn release(&self) {
        self.playing.store(false, Ordering::Relaxed);
        self.cancel_token.cancel();
    }
}
