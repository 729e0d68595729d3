//! Drives resolution from now-playing updates.
//!
//! The watcher listens for [`PlaybackEvent`]s on the service bus. A song whose
//! identity differs from the last one starts lyrics and artwork resolution;
//! position and play/pause updates for the same song are ignored. `Stopped`
//! cancels both resolvers.

use crate::CoreService;
use core_metadata::{Song, SongIdentity};
use core_runtime::events::{CoreEvent, EventStream, PlaybackEvent, RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct NowPlayingWatcher {
    service: CoreService,
    last: Option<SongIdentity>,
}

impl NowPlayingWatcher {
    pub fn new(service: CoreService) -> Self {
        Self {
            service,
            last: None,
        }
    }

    /// Runs the watcher on the current runtime until the handle is shut down
    /// or the bus closes.
    pub fn spawn(self) -> WatcherHandle {
        // Subscribe before spawning so no update published after this call is missed
        let events = self
            .service
            .subscribe()
            .filter(|event| matches!(event, CoreEvent::Playback(_)));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(events, shutdown.clone()));
        WatcherHandle { shutdown, task }
    }

    async fn run(mut self, mut events: EventStream, shutdown: CancellationToken) {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => event,
            };

            match event {
                Ok(CoreEvent::Playback(playback)) => self.handle(&playback),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Now-playing watcher lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Now-playing watcher stopped");
    }

    /// Applies one playback update.
    pub fn handle(&mut self, event: &PlaybackEvent) {
        match event {
            PlaybackEvent::SongChanged {
                name,
                artist,
                album,
                duration_ms,
                position_ms,
                is_playing,
            } => {
                let song = Song::new(name.as_str(), artist.as_str(), album.as_str())
                    .with_duration(*duration_ms as f64 / 1000.0)
                    .with_playback(*position_ms as f64 / 1000.0, *is_playing);

                let identity = song.identity();
                if self.last.as_ref() == Some(&identity) {
                    return;
                }

                debug!(song = %identity, "Now playing changed");
                self.last = Some(identity);
                self.service.resolve_all(song);
            }
            PlaybackEvent::Stopped => {
                self.last = None;
                self.service.cancel_all();
            }
        }
    }
}

/// Handle to a spawned [`NowPlayingWatcher`].
pub struct WatcherHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Asks the watcher to stop; resolutions already started keep running.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the watcher and waits for it to exit.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Now-playing watcher task failed");
        }
    }
}
