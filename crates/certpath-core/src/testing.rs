//! Shared fixtures for session and playback tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::model::{IconType, Module, ModuleStatus, Quiz, QuizQuestion};
use crate::session::{EngineConfig, Session};
use crate::traits::{EngineEvent, EventSink, Snapshot, SnapshotStore};

/// In-memory store whose writes can be made to fail.
#[derive(Default)]
pub struct TestStore {
    snapshots: Mutex<HashMap<String, Snapshot>>,
    fail_saves: AtomicBool,
    saves: AtomicU32,
}

impl TestStore {
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn saves(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored(&self, user_id: &str) -> Option<Snapshot> {
        self.snapshots.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl SnapshotStore for TestStore {
    fn name(&self) -> &str {
        "test"
    }

    async fn load(&self, user_id: &str) -> anyhow::Result<Option<Snapshot>> {
        Ok(self.stored(user_id))
    }

    async fn save(&self, user_id: &str, snapshot: &Snapshot) -> anyhow::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("simulated write failure");
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .lock()
            .unwrap()
            .insert(user_id.to_string(), snapshot.clone());
        Ok(())
    }
}

/// Records every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, _: &str, event: &EngineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn module(id: &str, title: &str, icon_type: IconType, xp_reward: u64) -> Module {
    Module {
        id: id.into(),
        title: title.into(),
        description: String::new(),
        icon_type,
        status: ModuleStatus::Locked,
        xp_reward,
    }
}

/// The five-question quiz bound to `intro`; answers are `[0, 1, 2, 0, 1]`.
pub fn intro_quiz() -> Quiz {
    Quiz {
        title: "Intro Check".into(),
        questions: (0..5)
            .map(|i| QuizQuestion {
                question: format!("Question {i}"),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_answer: i % 3,
            })
            .collect(),
    }
}

/// `intro` (quiz, 100) → `drills` (video, 150) → `final` (trophy, 500).
pub fn catalog() -> Arc<Catalog> {
    catalog_with_quiz(intro_quiz())
}

/// The standard pathway with `intro` bound to the given quiz.
pub fn catalog_with_quiz(quiz: Quiz) -> Arc<Catalog> {
    Arc::new(
        Catalog::new(
            "test-path",
            "Test Path",
            vec![
                module("intro", "Intro Check", IconType::Quiz, 100),
                module("drills", "Drill Video", IconType::Video, 150),
                module("final", "Certification", IconType::Trophy, 500),
            ],
            vec![quiz],
        )
        .unwrap(),
    )
}

pub async fn session(store: Arc<TestStore>) -> Session {
    session_with(store, EngineConfig::default()).await
}

pub async fn session_with(store: Arc<TestStore>, config: EngineConfig) -> Session {
    Session::open("athlete-1", catalog(), config, store)
        .await
        .unwrap()
}
