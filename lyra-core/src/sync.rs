use crate::error::PlaybackError;
use crate::lrc::{LyricLine, LyricSet};
use crate::playback::PlaybackState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Events emitted by the sync engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Lyrics were loaded for the current track
    LyricsLoaded { lyrics: Arc<LyricSet> },
    /// The current track has no usable lyrics
    LyricsNotFound,
    /// The highlighted line changed
    ActiveLineChanged {
        index: Option<usize>,
        line: Option<LyricLine>,
    },
    /// The controller reported a new playback error
    Error { error: PlaybackError },
}

/// Sync engine state
#[derive(Default)]
struct SyncEngineInner {
    lyrics: Option<Arc<LyricSet>>,
    active_index: Option<usize>,
    position: Duration,
    error: Option<PlaybackError>,
}

impl SyncEngineInner {
    /// Recompute the active line, returning the change event if it moved.
    ///
    /// `force` reports the line even when the index is unchanged, which is
    /// needed after the lyrics were replaced.
    fn refresh(&mut self, force: bool) -> Option<SyncEvent> {
        let lyrics = self.lyrics.as_ref();
        let index = lyrics.and_then(|l| l.active_index(self.position));
        if index == self.active_index && !force {
            return None;
        }
        self.active_index = index;
        let line = lyrics.zip(index).map(|(l, i)| l.lines[i].clone());
        Some(SyncEvent::ActiveLineChanged { index, line })
    }
}

/// Engine that maps the controller's playback time onto the lyric lines
pub struct SyncEngine {
    inner: RwLock<SyncEngineInner>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe to sync events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Replace the lyrics. An empty set is reported as "not found".
    pub async fn set_lyrics(&self, lyrics: LyricSet) {
        let mut inner = self.inner.write().await;

        if lyrics.is_empty() {
            inner.lyrics = None;
            let _ = self.event_tx.send(SyncEvent::LyricsNotFound);
        } else {
            let lyrics = Arc::new(lyrics);
            inner.lyrics = Some(Arc::clone(&lyrics));
            let _ = self.event_tx.send(SyncEvent::LyricsLoaded { lyrics });
        }

        if let Some(event) = inner.refresh(true) {
            let _ = self.event_tx.send(event);
        }
    }

    /// Parse raw LRC text and use it as the current lyrics
    pub async fn set_lyrics_text(&self, text: Option<&str>) {
        self.set_lyrics(LyricSet::parse_opt(text)).await;
    }

    /// Feed a new playback position. Returns the active index.
    pub async fn update_position(&self, position: Duration) -> Option<usize> {
        let mut inner = self.inner.write().await;
        inner.position = position;
        if let Some(event) = inner.refresh(false) {
            debug!("Active lyric line: {:?}", inner.active_index);
            let _ = self.event_tx.send(event);
        }
        inner.active_index
    }

    /// Feed a full controller snapshot
    pub async fn observe(&self, state: &PlaybackState) {
        {
            let mut inner = self.inner.write().await;
            if state.error != inner.error {
                inner.error = state.error;
                if let Some(error) = state.error {
                    let _ = self.event_tx.send(SyncEvent::Error { error });
                }
            }
        }
        self.update_position(state.current_time).await;
    }

    /// Follow a controller's state channel until cancelled or the channel closes
    #[must_use]
    pub fn start(
        self: Arc<Self>,
        mut rx: watch::Receiver<PlaybackState>,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let initial = rx.borrow_and_update().clone();
            self.observe(&initial).await;

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        info!("Sync engine shutting down");
                        break;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() {
                            info!("Playback state channel closed");
                            break;
                        }
                        let state = rx.borrow_and_update().clone();
                        self.observe(&state).await;
                    }
                }
            }
        })
    }

    /// Get current lyrics
    pub async fn lyrics(&self) -> Option<Arc<LyricSet>> {
        self.inner.read().await.lyrics.clone()
    }

    /// Index of the highlighted line
    pub async fn active_index(&self) -> Option<usize> {
        self.inner.read().await.active_index
    }

    /// The highlighted line
    pub async fn active_line(&self) -> Option<LyricLine> {
        let inner = self.inner.read().await;
        let lyrics = inner.lyrics.as_ref()?;
        inner.active_index.map(|i| lyrics.lines[i].clone())
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(SyncEngineInner::default()),
            event_tx,
        }
    }
}
