//! Cancellable playback ticker for the video gate.
//!
//! Simulated watch time is a repeated scheduled tick, never a blocking wait.
//! Cancelling or closing the viewing stops the ticker without touching the
//! pathway or the ledger.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::EngineError;
use crate::pathway::CompletionOutcome;
use crate::session::Session;

/// Tick schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Time between ticks, in milliseconds.
    pub period_ms: u64,
    /// Percent added per tick.
    pub step: u8,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            period_ms: 500,
            step: 5,
        }
    }
}

impl PlaybackConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }
}

/// Why a playback task ended.
#[derive(Debug)]
pub enum PlaybackEnd {
    /// The gate stopped playing: it reached 100%, or was paused or restarted.
    Stopped {
        percent: u8,
        completion: Option<CompletionOutcome>,
    },
    /// Cancelled through the handle, or the viewing was closed.
    Cancelled,
    /// A tick was rejected (e.g. the completion could not be persisted).
    Failed(EngineError),
}

/// Handle to a running playback task. Dropping it cancels the task.
pub struct PlaybackHandle {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<PlaybackEnd>,
}

impl PlaybackHandle {
    /// Stop ticking and wait for the task to wind down.
    pub async fn cancel(self) -> PlaybackEnd {
        let _ = self.cancel.send(());
        self.task.await.unwrap_or(PlaybackEnd::Cancelled)
    }

    /// Wait for playback to end on its own.
    pub async fn join(self) -> PlaybackEnd {
        let PlaybackHandle { cancel, task } = self;
        let end = task.await.unwrap_or(PlaybackEnd::Cancelled);
        drop(cancel);
        end
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Drive the session's viewing of `module_id` on a fixed schedule. Playback
/// ends as cancelled once that viewing is closed or replaced.
pub fn spawn_playback(
    session: Arc<Session>,
    module_id: impl Into<String>,
    config: PlaybackConfig,
) -> PlaybackHandle {
    let module_id = module_id.into();
    let (cancel, mut cancelled) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.period());
        // The first tick of an interval fires immediately.
        ticker.tick().await;
        let mut completion = None;

        loop {
            tokio::select! {
                _ = &mut cancelled => {
                    tracing::debug!(
                        user_id = session.user_id(),
                        module_id = %module_id,
                        "playback cancelled"
                    );
                    return PlaybackEnd::Cancelled;
                }
                _ = ticker.tick() => {
                    match session.tick_video_for(&module_id, config.step).await {
                        Ok(tick) => {
                            if tick.completion.is_some() {
                                completion = tick.completion;
                            }
                            if !tick.progress.playing {
                                return PlaybackEnd::Stopped {
                                    percent: tick.progress.percent,
                                    completion,
                                };
                            }
                        }
                        Err(EngineError::NoActiveVideo) => return PlaybackEnd::Cancelled,
                        Err(e) => {
                            tracing::warn!(
                                user_id = session.user_id(),
                                module_id = %module_id,
                                "playback stopped: {e}"
                            );
                            return PlaybackEnd::Failed(e);
                        }
                    }
                }
            }
        }
    });

    PlaybackHandle { cancel, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::model::{IconType, ModuleStatus};
    use crate::session::EngineConfig;
    use crate::testing::{self, TestStore};

    async fn watching_session(store: Arc<TestStore>) -> Arc<Session> {
        let session = Arc::new(testing::session(store).await);
        session.toggle_override(true).await.unwrap();
        session.start_video("drills").await.unwrap();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn playback_runs_to_completion() {
        let store = Arc::new(TestStore::default());
        let session = watching_session(Arc::clone(&store)).await;

        let handle = spawn_playback(
            Arc::clone(&session),
            "drills",
            PlaybackConfig {
                period_ms: 100,
                step: 25,
            },
        );
        match handle.join().await {
            PlaybackEnd::Stopped {
                percent,
                completion,
            } => {
                assert_eq!(percent, 100);
                assert!(completion.is_some());
            }
            other => panic!("unexpected end: {other:?}"),
        }
        assert_eq!(session.modules().await[1].status, ModuleStatus::Completed);
        assert_eq!(session.ledger().await.balance, 150);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_leaves_no_mutation() {
        let store = Arc::new(TestStore::default());
        let session = watching_session(Arc::clone(&store)).await;
        let saves = store.saves();

        let handle = spawn_playback(
            Arc::clone(&session),
            "drills",
            PlaybackConfig {
                period_ms: 1000,
                step: 10,
            },
        );
        tokio::time::sleep(std::time::Duration::from_millis(3500)).await;
        assert!(matches!(handle.cancel().await, PlaybackEnd::Cancelled));

        let progress = session.video_progress().await.unwrap();
        assert!(progress.percent > 0 && progress.percent < 100);
        assert_eq!(store.saves(), saves);
        assert_eq!(session.modules().await[1].status, ModuleStatus::Locked);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_video_stops_playback() {
        let store = Arc::new(TestStore::default());
        let session = watching_session(Arc::clone(&store)).await;

        let handle = spawn_playback(Arc::clone(&session), "drills", PlaybackConfig::default());
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        assert!(session.close_video().await);
        assert!(matches!(handle.join().await, PlaybackEnd::Cancelled));
        assert_eq!(session.ledger().await.balance, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_videos_cancels_the_old_playback() {
        let store = Arc::new(TestStore::default());
        let catalog = Arc::new(
            Catalog::new(
                "test-path",
                "Test Path",
                vec![
                    testing::module("drills", "Drill Video", IconType::Video, 150),
                    testing::module("cooldown", "Cooldown Video", IconType::Video, 80),
                ],
                vec![],
            )
            .unwrap(),
        );
        let session = Arc::new(
            Session::open("athlete-1", catalog, EngineConfig::default(), store.clone())
                .await
                .unwrap(),
        );
        session.toggle_override(true).await.unwrap();
        session.start_video("drills").await.unwrap();

        let handle = spawn_playback(
            Arc::clone(&session),
            "drills",
            PlaybackConfig {
                period_ms: 100,
                step: 10,
            },
        );
        tokio::time::sleep(std::time::Duration::from_millis(350)).await;
        session.start_video("cooldown").await.unwrap();
        assert!(matches!(handle.join().await, PlaybackEnd::Cancelled));

        // The replacement viewing was left alone.
        assert_eq!(session.video_progress().await.unwrap().percent, 0);
        let modules = session.modules().await;
        assert_eq!(modules[1].status, ModuleStatus::Locked);
        assert_eq!(session.ledger().await.balance, 0);
    }
}
