use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::media::{MediaEvent, MediaResource};
use crate::time::duration_from_secs_f64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use url::Url;

const LOG_TARGET: &str = "lyra::playback";

/// Current playback state of a single track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Whether audio is currently playing
    pub is_playing: bool,
    /// Current playback position
    pub current_time: Duration,
    /// Total track duration, zero until metadata arrives
    pub duration: Duration,
    /// Volume in `[0, 1]`
    pub volume: f64,
    /// Buffering or waiting for metadata
    pub is_loading: bool,
    /// Last user-facing failure, cleared by a successful play or fresh metadata
    pub error: Option<PlaybackError>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: Duration::ZERO,
            duration: Duration::ZERO,
            volume: 1.0,
            // Indeterminate until the media reports metadata
            is_loading: true,
            error: None,
        }
    }
}

impl PlaybackState {
    /// Apply a media lifecycle event.
    ///
    /// Buffering only surfaces as loading while playing, so a paused track
    /// that is slow to load does not show a spinner.
    pub fn apply(&mut self, event: &MediaEvent) {
        match event {
            MediaEvent::MetadataLoaded { duration } => {
                self.duration = duration_from_secs_f64(*duration);
                self.error = None;
                self.is_loading = false;
            }
            MediaEvent::TimeUpdate { position } => {
                self.current_time = duration_from_secs_f64(*position);
            }
            MediaEvent::Ended => {
                self.is_playing = false;
                self.current_time = Duration::ZERO;
            }
            MediaEvent::LoadError { .. } => {
                self.error = Some(PlaybackError::MediaLoadFailed);
                self.is_playing = false;
                self.is_loading = false;
            }
            MediaEvent::Waiting => {
                if self.is_playing {
                    self.is_loading = true;
                }
            }
            MediaEvent::CanPlay | MediaEvent::CanPlayThrough | MediaEvent::Playing => {
                self.is_loading = false;
            }
            MediaEvent::Progress { .. } => {}
        }
    }

    /// Fraction of the track played, 0.0 while the duration is unknown
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (self.current_time.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Time left until the end of the track
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.current_time)
    }
}

/// Owns the playback state of one media resource and applies the transition
/// rules for user actions and media events.
///
/// State changes are published through a `watch` channel; each transition
/// runs inside a single `send_if_modified` call so it completes before the
/// next event is looked at. [`dispose`](Self::dispose) waits for the event
/// loop to stop; dropping the last handle cancels it without waiting.
pub struct PlaybackController {
    inner: Arc<ControllerInner>,
    tasks: TaskTracker,
}

/// State shared with the event loop. The loop never holds the outer handle,
/// so dropping the controller is enough to stop it.
struct ControllerInner {
    media: Arc<dyn MediaResource>,
    state_tx: watch::Sender<PlaybackState>,
    cancel_token: CancellationToken,
}

impl PlaybackController {
    /// Create a controller for `media`, subscribe to its events and arm the
    /// load timeout. Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(media: Arc<dyn MediaResource>, config: &PlaybackConfig) -> Arc<Self> {
        let volume = if config.initial_volume.is_finite() {
            config.initial_volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        media.set_volume(volume);

        let (state_tx, _) = watch::channel(PlaybackState {
            volume,
            ..PlaybackState::default()
        });

        let events = media.subscribe();
        let load_deadline = config.load_timeout().map(|timeout| Instant::now() + timeout);

        let inner = Arc::new(ControllerInner {
            media,
            state_tx,
            cancel_token: CancellationToken::new(),
        });

        info!(target: LOG_TARGET, "Opening {}", inner.media.source_url());

        let tasks = TaskTracker::new();
        tasks.spawn(Arc::clone(&inner).run(events, load_deadline));
        tasks.close();

        Arc::new(Self { inner, tasks })
    }

    /// Read-only copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> PlaybackState {
        self.inner.state_tx.borrow().clone()
    }

    /// Observe state changes. The channel closes once the controller is dropped.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.state_tx.subscribe()
    }

    /// Source of the media this controller plays
    #[must_use]
    pub fn media_url(&self) -> &Url {
        self.inner.media.source_url()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Ask the media to start playing and record the outcome.
    ///
    /// A failure is stored as [`PlaybackError::PlaybackFailed`]; a success
    /// clears any previous error.
    pub async fn play(&self) {
        if self.is_disposed() {
            return;
        }

        let outcome = self.inner.media.play().await;

        if self.is_disposed() {
            debug!(target: LOG_TARGET, "Play resolved after dispose, ignoring");
            return;
        }

        match outcome {
            Ok(()) => {
                self.inner.transition(|state| {
                    state.is_playing = true;
                    state.error = None;
                });
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Playback failed: {}", e);
                self.inner.transition(|state| {
                    state.is_playing = false;
                    state.error = Some(PlaybackError::PlaybackFailed);
                });
            }
        }
    }

    /// Pause playback
    pub fn pause(&self) {
        if self.is_disposed() {
            return;
        }
        self.inner.media.pause();
        self.inner.transition(|state| state.is_playing = false);
    }

    /// Play when paused, pause when playing
    pub async fn toggle_play_pause(&self) {
        let is_playing = self.inner.state_tx.borrow().is_playing;
        if is_playing {
            self.pause();
        } else {
            self.play().await;
        }
    }

    /// Jump to `secs`, clamped to `[0, duration]`. Non-finite input is ignored.
    pub fn seek(&self, secs: f64) {
        if self.is_disposed() {
            return;
        }
        if !secs.is_finite() {
            warn!(target: LOG_TARGET, "Ignoring seek to {}", secs);
            return;
        }

        let mut target = Duration::ZERO;
        self.inner.transition(|state| {
            target = duration_from_secs_f64(secs).min(state.duration);
            state.current_time = target;
        });
        self.inner.media.set_position(target.as_secs_f64());
        debug!(target: LOG_TARGET, "Seeked to {:?}", target);
    }

    /// Jump to a fraction of the track, as a progress bar would
    pub fn seek_fraction(&self, fraction: f64) {
        if !fraction.is_finite() {
            warn!(target: LOG_TARGET, "Ignoring seek to fraction {}", fraction);
            return;
        }
        let duration = self.inner.state_tx.borrow().duration;
        self.seek(fraction.clamp(0.0, 1.0) * duration.as_secs_f64());
    }

    /// Set the volume, clamped to `[0, 1]`. Non-finite input is ignored.
    pub fn set_volume(&self, volume: f64) {
        if self.is_disposed() {
            return;
        }
        if !volume.is_finite() {
            warn!(target: LOG_TARGET, "Ignoring volume {}", volume);
            return;
        }

        let volume = volume.clamp(0.0, 1.0);
        self.inner.media.set_volume(volume);
        self.inner.transition(|state| state.volume = volume);
    }

    /// Detach from the media, cancel the load timeout and release the resource.
    ///
    /// Afterwards every action is a no-op and the state is frozen.
    pub async fn dispose(&self) {
        if self.is_disposed() {
            return;
        }

        info!(target: LOG_TARGET, "Disposing controller for {}", self.media_url());
        self.inner.cancel_token.cancel();
        // The event loop owns the media subscription and the timeout
        self.tasks.wait().await;

        self.inner.release_media();
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if self.is_disposed() {
            return;
        }
        debug!(target: LOG_TARGET, "Controller dropped without dispose");
        self.inner.cancel_token.cancel();
        self.inner.release_media();
    }
}

impl ControllerInner {
    fn is_disposed(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    fn release_media(&self) {
        self.media.pause();
        self.media.release();
    }

    /// Apply `f` atomically and notify subscribers if anything changed
    fn transition(&self, f: impl FnOnce(&mut PlaybackState)) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.state_tx.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            *state != before
        })
    }

    async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<MediaEvent>,
        mut load_deadline: Option<Instant>,
    ) {
        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    debug!(target: LOG_TARGET, "Event loop cancelled");
                    break;
                }
                () = wait_until(load_deadline) => {
                    load_deadline = None;
                    self.on_load_timeout();
                }
                event = events.recv() => match event {
                    Ok(event) => {
                        if disarms_load_timeout(&event) {
                            load_deadline = None;
                        }
                        self.on_media_event(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(target: LOG_TARGET, "Missed {} media events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!(target: LOG_TARGET, "Media event channel closed");
                        break;
                    }
                },
            }
        }
    }

    fn on_media_event(&self, event: &MediaEvent) {
        debug!(target: LOG_TARGET, "Media event: {:?}", event);

        if let MediaEvent::LoadError { reason } = event {
            warn!(target: LOG_TARGET, "Media load failed: {}", reason);
        }

        self.transition(|state| state.apply(event));

        if matches!(event, MediaEvent::Ended) {
            self.media.set_position(0.0);
        }
    }

    fn on_load_timeout(&self) {
        let fired = self.transition(|state| {
            if state.is_loading {
                state.error = Some(PlaybackError::LoadTimeout);
                state.is_loading = false;
            }
        });
        if fired {
            warn!(target: LOG_TARGET, "Timed out loading {}", self.media.source_url());
        }
    }
}

/// Events that prove the resource loaded (or definitively failed)
const fn disarms_load_timeout(event: &MediaEvent) -> bool {
    matches!(
        event,
        MediaEvent::MetadataLoaded { .. }
            | MediaEvent::CanPlay
            | MediaEvent::CanPlayThrough
            | MediaEvent::LoadError { .. }
    )
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Media double that only does what the test tells it to
    struct ScriptedMedia {
        url: Url,
        event_tx: broadcast::Sender<MediaEvent>,
        play_result: Mutex<Result<(), MediaError>>,
        position: Mutex<f64>,
        volume: Mutex<f64>,
        released: AtomicBool,
    }

    impl ScriptedMedia {
        fn new() -> Arc<Self> {
            let (event_tx, _) = broadcast::channel(16);
            Arc::new(Self {
                url: Url::parse("https://example.com/superficial-love.mp3").unwrap(),
                event_tx,
                play_result: Mutex::new(Ok(())),
                position: Mutex::new(0.0),
                volume: Mutex::new(1.0),
                released: AtomicBool::new(false),
            })
        }

        fn emit(&self, event: MediaEvent) {
            // Nobody is listening once the controller is disposed
            let _ = self.event_tx.send(event);
        }

        fn fail_play(&self, error: MediaError) {
            *self.play_result.lock().unwrap() = Err(error);
        }

        fn position(&self) -> f64 {
            *self.position.lock().unwrap()
        }

        fn volume(&self) -> f64 {
            *self.volume.lock().unwrap()
        }
    }

    #[async_trait]
    impl MediaResource for ScriptedMedia {
        fn source_url(&self) -> &Url {
            &self.url
        }

        async fn play(&self) -> Result<(), MediaError> {
            self.play_result.lock().unwrap().clone()
        }

        fn pause(&self) {}

        fn set_position(&self, secs: f64) {
            *self.position.lock().unwrap() = secs;
        }

        fn set_volume(&self, volume: f64) {
            *self.volume.lock().unwrap() = volume;
        }

        fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
            self.event_tx.subscribe()
        }

        fn release(&self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn config() -> PlaybackConfig {
        PlaybackConfig::default()
    }

    /// Let the controller's event loop drain pending events
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn loaded_controller(duration: f64) -> (Arc<ScriptedMedia>, Arc<PlaybackController>) {
        let media = ScriptedMedia::new();
        let controller = PlaybackController::spawn(media.clone(), &config());
        media.emit(MediaEvent::MetadataLoaded { duration });
        settle().await;
        (media, controller)
    }

    #[test]
    fn test_playback_state_default() {
        let state = PlaybackState::default();
        assert!(!state.is_playing);
        assert_eq!(state.current_time, Duration::ZERO);
        assert_eq!(state.duration, Duration::ZERO);
        assert!((state.volume - 1.0).abs() < f64::EPSILON);
        assert!(state.is_loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_apply_metadata_clears_error_and_loading() {
        let mut state = PlaybackState {
            error: Some(PlaybackError::LoadTimeout),
            ..Default::default()
        };
        state.apply(&MediaEvent::MetadataLoaded { duration: 232.0 });
        assert_eq!(state.duration, Duration::from_secs(232));
        assert!(state.error.is_none());
        assert!(!state.is_loading);
    }

    #[test]
    fn test_apply_waiting_only_while_playing() {
        let mut state = PlaybackState {
            is_loading: false,
            ..Default::default()
        };
        state.apply(&MediaEvent::Waiting);
        assert!(!state.is_loading);

        state.is_playing = true;
        state.apply(&MediaEvent::Waiting);
        assert!(state.is_loading);

        state.apply(&MediaEvent::Playing);
        assert!(!state.is_loading);
    }

    #[test]
    fn test_apply_load_error() {
        let mut state = PlaybackState {
            is_playing: true,
            ..Default::default()
        };
        state.apply(&MediaEvent::LoadError {
            reason: "404".to_string(),
        });
        assert_eq!(state.error, Some(PlaybackError::MediaLoadFailed));
        assert!(!state.is_playing);
        assert!(!state.is_loading);
    }

    #[test]
    fn test_apply_progress_is_noop() {
        let mut state = PlaybackState::default();
        state.apply(&MediaEvent::Progress {
            buffered: 10.0,
            duration: 100.0,
        });
        assert_eq!(state, PlaybackState::default());
    }

    #[test]
    fn test_progress_and_remaining() {
        let state = PlaybackState {
            current_time: Duration::from_secs(58),
            duration: Duration::from_secs(232),
            ..Default::default()
        };
        assert!((state.progress() - 0.25).abs() < 1e-9);
        assert_eq!(state.remaining(), Duration::from_secs(174));
        assert!(PlaybackState::default().progress().abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_snapshot() {
        let media = ScriptedMedia::new();
        let controller = PlaybackController::spawn(media.clone(), &config());
        let state = controller.snapshot();
        assert!(!state.is_playing);
        assert_eq!(state.current_time, Duration::ZERO);
        assert_eq!(state.duration, Duration::ZERO);
        assert!(state.error.is_none());
        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_seek_and_ended_scenario() {
        let (media, controller) = loaded_controller(232.0).await;

        let state = controller.snapshot();
        assert_eq!(state.duration, Duration::from_secs(232));
        assert!(state.error.is_none());
        assert!(!state.is_loading);

        controller.seek(9999.0);
        assert_eq!(controller.snapshot().current_time, Duration::from_secs(232));
        assert!((media.position() - 232.0).abs() < f64::EPSILON);

        controller.play().await;
        assert!(controller.snapshot().is_playing);

        media.emit(MediaEvent::Ended);
        settle().await;
        let state = controller.snapshot();
        assert_eq!(state.current_time, Duration::ZERO);
        assert!(!state.is_playing);
        assert!(media.position().abs() < f64::EPSILON);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_clamps_low_and_before_metadata() {
        let media = ScriptedMedia::new();
        let controller = PlaybackController::spawn(media.clone(), &config());

        // Duration unknown, so every seek lands on zero
        controller.seek(30.0);
        assert_eq!(controller.snapshot().current_time, Duration::ZERO);

        media.emit(MediaEvent::MetadataLoaded { duration: 100.0 });
        settle().await;

        controller.seek(-5.0);
        assert_eq!(controller.snapshot().current_time, Duration::ZERO);

        controller.seek(f64::NAN);
        assert_eq!(controller.snapshot().current_time, Duration::ZERO);

        controller.seek(42.5);
        assert_eq!(
            controller.snapshot().current_time,
            Duration::from_millis(42_500)
        );

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_fraction() {
        let (_media, controller) = loaded_controller(232.0).await;
        controller.seek_fraction(0.5);
        assert_eq!(controller.snapshot().current_time, Duration::from_secs(116));
        controller.seek_fraction(7.0);
        assert_eq!(controller.snapshot().current_time, Duration::from_secs(232));
        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_updates_follow_media() {
        let (media, controller) = loaded_controller(232.0).await;
        let mut rx = controller.subscribe();

        media.emit(MediaEvent::TimeUpdate { position: 13.78 });
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().current_time,
            Duration::from_secs_f64(13.78)
        );

        // Discontinuous jump backwards after a seek is accepted
        media.emit(MediaEvent::TimeUpdate { position: 2.0 });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().current_time, Duration::from_secs(2));

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_failure_records_error() {
        let (media, controller) = loaded_controller(232.0).await;
        media.fail_play(MediaError::AutoplayBlocked);

        controller.play().await;
        let state = controller.snapshot();
        assert!(!state.is_playing);
        assert_eq!(state.error, Some(PlaybackError::PlaybackFailed));

        // Retry succeeds and clears the error
        *media.play_result.lock().unwrap() = Ok(());
        controller.play().await;
        let state = controller.snapshot();
        assert!(state.is_playing);
        assert!(state.error.is_none());

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_twice_ends_paused() {
        let (_media, controller) = loaded_controller(232.0).await;

        controller.toggle_play_pause().await;
        assert!(controller.snapshot().is_playing);
        controller.toggle_play_pause().await;
        assert!(!controller.snapshot().is_playing);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_volume_clamps() {
        let (media, controller) = loaded_controller(232.0).await;

        controller.set_volume(-1.0);
        assert!(controller.snapshot().volume.abs() < f64::EPSILON);
        assert!(media.volume().abs() < f64::EPSILON);

        controller.set_volume(2.0);
        assert!((controller.snapshot().volume - 1.0).abs() < f64::EPSILON);
        assert!((media.volume() - 1.0).abs() < f64::EPSILON);

        controller.set_volume(0.4);
        controller.set_volume(f64::NAN);
        assert!((controller.snapshot().volume - 0.4).abs() < f64::EPSILON);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_volume_from_config() {
        let media = ScriptedMedia::new();
        let config = PlaybackConfig {
            initial_volume: 0.3,
            ..PlaybackConfig::default()
        };
        let controller = PlaybackController::spawn(media.clone(), &config);
        assert!((controller.snapshot().volume - 0.3).abs() < f64::EPSILON);
        assert!((media.volume() - 0.3).abs() < f64::EPSILON);
        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffering_while_paused_not_loading() {
        let (media, controller) = loaded_controller(232.0).await;

        media.emit(MediaEvent::Waiting);
        settle().await;
        assert!(!controller.snapshot().is_loading);

        controller.play().await;
        media.emit(MediaEvent::Waiting);
        settle().await;
        assert!(controller.snapshot().is_loading);

        media.emit(MediaEvent::Playing);
        settle().await;
        assert!(!controller.snapshot().is_loading);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_error_then_retry() {
        let media = ScriptedMedia::new();
        let controller = PlaybackController::spawn(media.clone(), &config());

        media.emit(MediaEvent::LoadError {
            reason: "404 Not Found".to_string(),
        });
        settle().await;
        let state = controller.snapshot();
        assert_eq!(state.error, Some(PlaybackError::MediaLoadFailed));
        assert!(!state.is_loading);
        assert!(!state.is_playing);

        // The load error disarmed the timeout, so it must not overwrite the error
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(
            controller.snapshot().error,
            Some(PlaybackError::MediaLoadFailed)
        );

        controller.play().await;
        assert!(controller.snapshot().error.is_none());

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_timeout_fires_without_metadata() {
        let media = ScriptedMedia::new();
        let controller = PlaybackController::spawn(media.clone(), &config());

        tokio::time::sleep(Duration::from_millis(9_900)).await;
        assert!(controller.snapshot().error.is_none());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = controller.snapshot();
        assert_eq!(state.error, Some(PlaybackError::LoadTimeout));
        assert!(!state.is_loading);

        // Late metadata still recovers the controller
        media.emit(MediaEvent::MetadataLoaded { duration: 232.0 });
        settle().await;
        assert!(controller.snapshot().error.is_none());

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_disarms_load_timeout() {
        let (_media, controller) = loaded_controller(232.0).await;
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(controller.snapshot().error.is_none());
        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_timeout_disabled() {
        let media = ScriptedMedia::new();
        let config = PlaybackConfig {
            load_timeout_ms: 0,
            ..PlaybackConfig::default()
        };
        let controller = PlaybackController::spawn(media.clone(), &config);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let state = controller.snapshot();
        assert!(state.error.is_none());
        assert!(state.is_loading);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_releases_and_freezes_state() {
        let (media, controller) = loaded_controller(232.0).await;
        controller.seek(10.0);

        controller.dispose().await;
        assert!(controller.is_disposed());
        assert!(media.released.load(Ordering::SeqCst));

        let frozen = controller.snapshot();
        media.emit(MediaEvent::TimeUpdate { position: 50.0 });
        settle().await;
        controller.play().await;
        controller.seek(100.0);
        controller.set_volume(0.1);
        assert_eq!(controller.snapshot(), frozen);

        // A second dispose is harmless
        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_can_play_disarms_load_timeout() {
        let media = ScriptedMedia::new();
        let controller = PlaybackController::spawn(media.clone(), &config());

        media.emit(MediaEvent::CanPlay);
        tokio::time::sleep(Duration::from_secs(15)).await;

        let state = controller.snapshot();
        assert!(state.error.is_none());
        assert!(!state.is_loading);
        assert_eq!(state.duration, Duration::ZERO);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_without_dispose_releases_media() {
        let (media, controller) = loaded_controller(232.0).await;
        let mut state_rx = controller.subscribe();

        drop(controller);
        settle().await;

        assert!(media.released.load(Ordering::SeqCst));
        // Only the test's handle is left once the event loop has exited
        assert_eq!(Arc::strong_count(&media), 1);
        assert!(state_rx.changed().await.is_err());
    }
}
