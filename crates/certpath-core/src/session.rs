//! Per-user session: the single owner of one learner's pathway and ledger.
//!
//! Every event runs under the session lock as compute, persist, commit.
//! The new state is computed on copies, written to the [`SnapshotStore`], and
//! only swapped in after the write succeeds. A failed write leaves the
//! previous state as the state of record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{LedgerState, Resolution, Transaction, TxStamp};
use crate::model::{Mechanism, Module, ModuleStatus};
use crate::pathway::{CompletionOutcome, Interaction, OverridePolicy, Pathway, Progression};
use crate::quiz::{AnswerFeedback, QuizAttempt, QuizResult, QuizStep, DEFAULT_PASS_RATIO};
use crate::tier::{TierStatus, TierTable};
use crate::traits::{EngineEvent, EventSink, NoopSink, Snapshot, SnapshotStore, SNAPSHOT_VERSION};
use crate::video::{VideoGate, VideoProgress};

/// Configuration for the progression engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Share of correct answers needed to pass a quiz.
    pub pass_ratio: f64,
    /// Fixed XP for passing a quiz. `None` uses the module's `xp_reward`.
    pub quiz_reward: Option<u64>,
    /// What the administrative override allows.
    pub override_policy: OverridePolicy,
    /// Tier thresholds.
    pub tiers: TierTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pass_ratio: DEFAULT_PASS_RATIO,
            quiz_reward: None,
            override_policy: OverridePolicy::default(),
            tiers: TierTable::default(),
        }
    }
}

/// The current quiz question as shown to a learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub module_id: String,
    pub question_index: usize,
    pub question_count: usize,
    pub prompt: String,
    pub options: Vec<String>,
}

/// What advancing the quiz led to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum QuizAdvance {
    Next(QuestionView),
    /// Passed and the module completion was committed.
    Passed {
        result: QuizResult,
        completion: CompletionOutcome,
    },
    /// Passed, but the module is still locked (e.g. opened through an
    /// interact-only override), so nothing was recorded. The attempt is closed.
    PassedWhileLocked { result: QuizResult },
    /// Below threshold. Nothing changed; retry or close.
    Failed { result: QuizResult },
}

/// Result of a video tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoTick {
    pub progress: VideoProgress,
    /// Present on the tick that completed the module. Stays `None` when the
    /// viewing reached 100% on a module that is still locked.
    pub completion: Option<CompletionOutcome>,
}

struct OpenQuiz {
    module_id: String,
    attempt: QuizAttempt,
}

struct OpenVideo {
    module_id: String,
    gate: VideoGate,
}

struct SessionState {
    progression: Progression,
    ledger: LedgerState,
    quiz: Option<OpenQuiz>,
    video: Option<OpenVideo>,
}

/// One learner's progression and ledger.
pub struct Session {
    user_id: String,
    catalog: Arc<Catalog>,
    config: EngineConfig,
    store: Arc<dyn SnapshotStore>,
    events: Arc<dyn EventSink>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Load a user's state from the store, or start fresh from the catalog.
    pub async fn open(
        user_id: &str,
        catalog: Arc<Catalog>,
        config: EngineConfig,
        store: Arc<dyn SnapshotStore>,
    ) -> EngineResult<Self> {
        let stored = store
            .load(user_id)
            .await
            .map_err(EngineError::PersistenceFailure)?;

        let (pathway, ledger, admin_override) = match stored {
            Some(snapshot) => {
                tracing::debug!(user_id, version = snapshot.version, "restoring snapshot");
                (
                    Pathway::restore(snapshot.modules)?,
                    snapshot.ledger,
                    snapshot.admin_override,
                )
            }
            None => {
                tracing::info!(user_id, pathway = %catalog.id, "starting fresh session");
                (catalog.fresh_pathway()?, LedgerState::new(), false)
            }
        };

        let progression =
            Progression::new(pathway, config.override_policy).with_override(admin_override);

        Ok(Self {
            user_id: user_id.to_string(),
            catalog,
            config,
            store,
            events: Arc::new(NoopSink),
            state: Mutex::new(SessionState {
                progression,
                ledger,
                quiz: None,
                video: None,
            }),
        })
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // -----------------------------------------------------------------------
    // Read models
    // -----------------------------------------------------------------------

    pub async fn modules(&self) -> Vec<Module> {
        let state = self.state.lock().await;
        state.progression.pathway().modules().to_vec()
    }

    pub async fn ledger(&self) -> LedgerState {
        self.state.lock().await.ledger.clone()
    }

    pub async fn tier_status(&self) -> TierStatus {
        let state = self.state.lock().await;
        self.config.tiers.tier_for(state.ledger.lifetime_earned)
    }

    pub async fn override_enabled(&self) -> bool {
        self.state.lock().await.progression.override_enabled()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        snapshot_of(&state.progression, &state.ledger)
    }

    // -----------------------------------------------------------------------
    // Progression
    // -----------------------------------------------------------------------

    /// Whether a module can be opened. Modules the catalog cannot serve are
    /// reported as blocked, whatever their status or the override.
    pub async fn attempt_interact(&self, module_id: &str) -> EngineResult<Interaction> {
        let state = self.state.lock().await;
        interaction_for(&state, &self.catalog, module_id)
    }

    /// Directly complete a trophy or generic module.
    pub async fn claim_module(&self, module_id: &str) -> EngineResult<CompletionOutcome> {
        let mut state = self.state.lock().await;
        let module = require_mechanism(&state, module_id, Mechanism::Claim, "claim")?;
        let reward = module.xp_reward;
        self.complete(&mut state, module_id, reward).await
    }

    /// Turn the administrative override on or off.
    pub async fn toggle_override(&self, enabled: bool) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        if state.progression.override_enabled() == enabled {
            return Ok(());
        }
        let mut progression = state.progression.clone();
        progression.set_override(enabled);
        let ledger = state.ledger.clone();
        self.commit(&mut state, progression, ledger).await?;
        tracing::info!(user_id = %self.user_id, enabled, "admin override toggled");
        self.emit(&[EngineEvent::OverrideToggled { enabled }]);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Quiz
    // -----------------------------------------------------------------------

    /// Open a fresh attempt for a quiz module. Replaces any open attempt.
    pub async fn start_quiz(&self, module_id: &str) -> EngineResult<QuestionView> {
        let mut state = self.state.lock().await;
        let module = require_mechanism(&state, module_id, Mechanism::Quiz, "quiz")?;
        let quiz = self.catalog.quiz_for(&module)?.clone();
        require_interaction(&state, &self.catalog, module_id)?;

        let attempt = QuizAttempt::start(quiz, self.config.pass_ratio)?;
        let view = question_view(module_id, &attempt);
        state.quiz = Some(OpenQuiz {
            module_id: module_id.to_string(),
            attempt,
        });
        Ok(view)
    }

    pub async fn current_question(&self) -> EngineResult<QuestionView> {
        let state = self.state.lock().await;
        let open = state.quiz.as_ref().ok_or(EngineError::NoActiveQuiz)?;
        Ok(question_view(&open.module_id, &open.attempt))
    }

    pub async fn submit_quiz_answer(
        &self,
        question_index: usize,
        selected_option: usize,
    ) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        let open = state.quiz.as_mut().ok_or(EngineError::NoActiveQuiz)?;
        open.attempt.select(question_index, selected_option)
    }

    pub async fn confirm_quiz_answer(&self) -> EngineResult<AnswerFeedback> {
        let mut state = self.state.lock().await;
        let open = state.quiz.as_mut().ok_or(EngineError::NoActiveQuiz)?;
        open.attempt.confirm()
    }

    /// Move to the next question, or finish the attempt.
    ///
    /// A pass completes the module and closes the attempt. A fail keeps the
    /// finished attempt open so it can be retried or closed.
    pub async fn advance_quiz(&self) -> EngineResult<QuizAdvance> {
        let mut state = self.state.lock().await;
        let open = state.quiz.as_mut().ok_or(EngineError::NoActiveQuiz)?;
        let module_id = open.module_id.clone();

        let result = match open.attempt.advance()? {
            QuizStep::Next { .. } => {
                return Ok(QuizAdvance::Next(question_view(&module_id, &open.attempt)));
            }
            QuizStep::Finished(result) => result,
        };

        if !result.passed {
            tracing::info!(
                user_id = %self.user_id,
                module_id = %module_id,
                score = result.score,
                threshold = result.threshold,
                "quiz failed"
            );
            return Ok(QuizAdvance::Failed { result });
        }

        let reward = match self.config.quiz_reward {
            Some(reward) => reward,
            None => module_of(&state, &module_id)?.xp_reward,
        };
        let completion = self.complete(&mut state, &module_id, reward).await;
        let completion = self.settle_completion(&module_id, completion)?;
        state.quiz = None;
        Ok(match completion {
            Some(completion) => QuizAdvance::Passed { result, completion },
            None => QuizAdvance::PassedWhileLocked { result },
        })
    }

    /// Reset the open attempt to its first question.
    pub async fn retry_quiz(&self) -> EngineResult<QuestionView> {
        let mut state = self.state.lock().await;
        let open = state.quiz.as_mut().ok_or(EngineError::NoActiveQuiz)?;
        open.attempt.reset();
        Ok(question_view(&open.module_id, &open.attempt))
    }

    /// Abandon the open attempt. Returns whether one was open.
    pub async fn close_quiz(&self) -> bool {
        self.state.lock().await.quiz.take().is_some()
    }

    // -----------------------------------------------------------------------
    // Video
    // -----------------------------------------------------------------------

    /// Open a viewing for a video module and start playing.
    pub async fn start_video(&self, module_id: &str) -> EngineResult<VideoProgress> {
        let mut state = self.state.lock().await;
        require_mechanism(&state, module_id, Mechanism::Video, "video")?;
        require_interaction(&state, &self.catalog, module_id)?;

        let mut gate = VideoGate::new();
        gate.play();
        let progress = gate.progress();
        state.video = Some(OpenVideo {
            module_id: module_id.to_string(),
            gate,
        });
        Ok(progress)
    }

    /// Advance the open viewing. The tick that reaches 100% completes the
    /// module; if that commit cannot be persisted, the tick is not applied
    /// either.
    pub async fn tick_video_progress(&self, delta_percent: u8) -> EngineResult<VideoTick> {
        let mut state = self.state.lock().await;
        let module_id = state
            .video
            .as_ref()
            .map(|open| open.module_id.clone())
            .ok_or(EngineError::NoActiveVideo)?;
        self.tick_open_video(&mut state, module_id, delta_percent)
            .await
    }

    /// Like [`tick_video_progress`](Self::tick_video_progress), but only if
    /// the open viewing belongs to `module_id`. Otherwise `NoActiveVideo`.
    pub async fn tick_video_for(
        &self,
        module_id: &str,
        delta_percent: u8,
    ) -> EngineResult<VideoTick> {
        let mut state = self.state.lock().await;
        match state.video.as_ref() {
            Some(open) if open.module_id == module_id => {}
            _ => return Err(EngineError::NoActiveVideo),
        }
        self.tick_open_video(&mut state, module_id.to_string(), delta_percent)
            .await
    }

    async fn tick_open_video(
        &self,
        state: &mut SessionState,
        module_id: String,
        delta_percent: u8,
    ) -> EngineResult<VideoTick> {
        let open = state.video.as_ref().ok_or(EngineError::NoActiveVideo)?;
        let mut gate = open.gate.clone();

        let progress = gate.tick(delta_percent);
        tracing::debug!(module_id = %module_id, percent = progress.percent, "video tick");

        let completion = if progress.just_completed {
            let reward = module_of(state, &module_id)?.xp_reward;
            let completion = self.complete(state, &module_id, reward).await;
            self.settle_completion(&module_id, completion)?
        } else {
            None
        };

        if let Some(open) = state.video.as_mut() {
            open.gate = gate;
        }
        Ok(VideoTick {
            progress,
            completion,
        })
    }

    /// Rewind the open viewing to zero and start playing again.
    pub async fn restart_video(&self) -> EngineResult<VideoProgress> {
        let mut state = self.state.lock().await;
        let open = state.video.as_mut().ok_or(EngineError::NoActiveVideo)?;
        open.gate.restart();
        open.gate.play();
        Ok(open.gate.progress())
    }

    pub async fn pause_video(&self) -> EngineResult<VideoProgress> {
        let mut state = self.state.lock().await;
        let open = state.video.as_mut().ok_or(EngineError::NoActiveVideo)?;
        open.gate.pause();
        Ok(open.gate.progress())
    }

    pub async fn video_progress(&self) -> EngineResult<VideoProgress> {
        let state = self.state.lock().await;
        let open = state.video.as_ref().ok_or(EngineError::NoActiveVideo)?;
        Ok(open.gate.progress())
    }

    /// Discard the open viewing. Returns whether one was open.
    pub async fn close_video(&self) -> bool {
        self.state.lock().await.video.take().is_some()
    }

    // -----------------------------------------------------------------------
    // Ledger
    // -----------------------------------------------------------------------

    /// Post an earn, either immediately spendable or pending verification.
    pub async fn earn(
        &self,
        amount: u64,
        category: &str,
        description: &str,
        pending: bool,
    ) -> EngineResult<Transaction> {
        let mut state = self.state.lock().await;
        let stamp = TxStamp::now();
        let transaction_id = stamp.id.clone();
        let (ledger, event) = if pending {
            (
                state
                    .ledger
                    .grant_pending(amount, category, description, stamp)?,
                EngineEvent::PendingPosted {
                    amount,
                    transaction_id: transaction_id.clone(),
                },
            )
        } else {
            (
                state.ledger.grant(amount, category, description, stamp)?,
                EngineEvent::XpGranted {
                    amount,
                    transaction_id: transaction_id.clone(),
                },
            )
        };
        self.post(&mut state, ledger, vec![event]).await?;
        transaction(&state.ledger, &transaction_id)
    }

    pub async fn spend(
        &self,
        amount: u64,
        category: &str,
        description: &str,
    ) -> EngineResult<Transaction> {
        let mut state = self.state.lock().await;
        let stamp = TxStamp::now();
        let transaction_id = stamp.id.clone();
        let ledger = state.ledger.spend(amount, category, description, stamp)?;
        let event = EngineEvent::Spent {
            amount,
            transaction_id: transaction_id.clone(),
        };
        self.post(&mut state, ledger, vec![event]).await?;
        transaction(&state.ledger, &transaction_id)
    }

    /// Approve or reject a pending transaction.
    pub async fn resolve_pending(
        &self,
        transaction_id: &str,
        resolution: Resolution,
    ) -> EngineResult<Transaction> {
        let mut state = self.state.lock().await;
        let ledger = state
            .ledger
            .resolve_pending(transaction_id, resolution, chrono::Utc::now())?;
        let event = EngineEvent::PendingResolved {
            transaction_id: transaction_id.to_string(),
            resolution,
        };
        self.post(&mut state, ledger, vec![event]).await?;
        transaction(&state.ledger, transaction_id)
    }

    // -----------------------------------------------------------------------
    // Commit path
    // -----------------------------------------------------------------------

    async fn complete(
        &self,
        state: &mut SessionState,
        module_id: &str,
        reward: u64,
    ) -> EngineResult<CompletionOutcome> {
        let mut progression = state.progression.clone();
        let outcome = progression.complete_module(module_id, reward)?;

        if outcome.is_noop() {
            return Ok(outcome);
        }

        let mut events = Vec::new();
        let mut ledger = state.ledger.clone();
        if let CompletionOutcome::Completed {
            module_id: completed,
            unlocked,
            grant,
            finished,
        } = &outcome
        {
            events.push(EngineEvent::ModuleCompleted {
                module_id: completed.clone(),
            });
            if let Some(next) = unlocked {
                events.push(EngineEvent::ModuleUnlocked {
                    module_id: next.clone(),
                });
            }
            if let Some(grant) = grant {
                let stamp = TxStamp::now();
                events.push(EngineEvent::XpGranted {
                    amount: grant.amount,
                    transaction_id: stamp.id.clone(),
                });
                ledger = ledger.grant(grant.amount, &grant.category, &grant.description, stamp)?;
            }
            if *finished {
                events.push(EngineEvent::PathwayFinished);
            }
        }

        let tier_before = self.config.tiers.tier_for(state.ledger.lifetime_earned);
        self.commit(state, progression, ledger).await?;
        self.push_tier_change(state, &tier_before, &mut events);
        self.emit(&events);
        Ok(outcome)
    }

    async fn post(
        &self,
        state: &mut SessionState,
        ledger: LedgerState,
        mut events: Vec<EngineEvent>,
    ) -> EngineResult<()> {
        let tier_before = self.config.tiers.tier_for(state.ledger.lifetime_earned);
        let progression = state.progression.clone();
        self.commit(state, progression, ledger).await?;
        self.push_tier_change(state, &tier_before, &mut events);
        self.emit(&events);
        Ok(())
    }

    /// Persist, then swap in. Nothing in memory changes if the write fails.
    async fn commit(
        &self,
        state: &mut SessionState,
        progression: Progression,
        ledger: LedgerState,
    ) -> EngineResult<()> {
        let snapshot = snapshot_of(&progression, &ledger);
        if let Err(e) = self.store.save(&self.user_id, &snapshot).await {
            tracing::error!(
                user_id = %self.user_id,
                store = self.store.name(),
                "snapshot write failed, keeping previous state: {e:#}"
            );
            return Err(EngineError::PersistenceFailure(e));
        }
        state.progression = progression;
        state.ledger = ledger;
        Ok(())
    }

    fn push_tier_change(
        &self,
        state: &SessionState,
        before: &TierStatus,
        events: &mut Vec<EngineEvent>,
    ) {
        let after = self.config.tiers.tier_for(state.ledger.lifetime_earned);
        if after.current != before.current {
            tracing::info!(user_id = %self.user_id, tier = %after.current.name, "tier reached");
            events.push(EngineEvent::TierReached {
                tier: after.current.name,
            });
        }
    }

    /// A completion that cannot be persisted is an error, and the caller
    /// must not apply its own step either. A completion refused because the
    /// module is still locked is logged and reported as `None`.
    fn settle_completion(
        &self,
        module_id: &str,
        completion: EngineResult<CompletionOutcome>,
    ) -> EngineResult<Option<CompletionOutcome>> {
        match completion {
            Ok(outcome) => Ok(Some(outcome)),
            Err(EngineError::InvalidTransition { reason, .. }) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    module_id = %module_id,
                    "module not completed: {reason}"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn emit(&self, events: &[EngineEvent]) {
        for event in events {
            self.events.on_event(&self.user_id, event);
        }
    }
}

fn snapshot_of(progression: &Progression, ledger: &LedgerState) -> Snapshot {
    Snapshot {
        version: SNAPSHOT_VERSION,
        modules: progression.pathway().modules().to_vec(),
        ledger: ledger.clone(),
        admin_override: progression.override_enabled(),
    }
}

fn module_of(state: &SessionState, module_id: &str) -> EngineResult<Module> {
    state
        .progression
        .pathway()
        .get(module_id)
        .cloned()
        .ok_or_else(|| EngineError::module_not_found(module_id))
}

fn require_mechanism(
    state: &SessionState,
    module_id: &str,
    mechanism: Mechanism,
    attempted: &'static str,
) -> EngineResult<Module> {
    let module = module_of(state, module_id)?;
    let expected = module.icon_type.mechanism();
    if expected != mechanism {
        return Err(EngineError::WrongMechanism {
            module_id: module_id.to_string(),
            expected: expected.as_str(),
            attempted,
        });
    }
    Ok(module)
}

fn interaction_for(
    state: &SessionState,
    catalog: &Catalog,
    module_id: &str,
) -> EngineResult<Interaction> {
    let interaction = state.progression.attempt_interact(module_id)?;
    if catalog.is_offerable(&module_of(state, module_id)?) {
        return Ok(interaction);
    }
    Ok(Interaction {
        allowed: false,
        via_override: false,
        blocked: true,
        ..interaction
    })
}

fn require_interaction(
    state: &SessionState,
    catalog: &Catalog,
    module_id: &str,
) -> EngineResult<()> {
    let interaction = interaction_for(state, catalog, module_id)?;
    if interaction.blocked {
        return Err(EngineError::Configuration(format!(
            "module {module_id} is unavailable"
        )));
    }
    if !interaction.allowed {
        return Err(EngineError::InvalidTransition {
            module_id: module_id.to_string(),
            status: ModuleStatus::Locked,
            reason: "module is locked".into(),
        });
    }
    Ok(())
}

fn question_view(module_id: &str, attempt: &QuizAttempt) -> QuestionView {
    let question = attempt.current_question();
    QuestionView {
        module_id: module_id.to_string(),
        question_index: attempt.current_index(),
        question_count: attempt.question_count(),
        prompt: question.question.clone(),
        options: question.options.clone(),
    }
}

fn transaction(ledger: &LedgerState, transaction_id: &str) -> EngineResult<Transaction> {
    ledger
        .find(transaction_id)
        .cloned()
        .ok_or_else(|| EngineError::transaction_not_found(transaction_id))
}
