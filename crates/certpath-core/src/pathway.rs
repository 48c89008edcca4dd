//! Module graph and progression controller.
//!
//! A [`Pathway`] is the ordered module list. [`Progression`] owns one pathway
//! together with the administrative override and applies completion events
//! to it as whole-graph, copy-on-write transitions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::{Module, ModuleStatus};

/// Ledger category used for XP granted by module completion.
pub const MODULE_XP_CATEGORY: &str = "Training";

/// Ordered list of training modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pathway {
    modules: Vec<Module>,
}

impl Pathway {
    /// Build a pathway in its initial state: first module active, the rest locked.
    pub fn fresh(mut modules: Vec<Module>) -> EngineResult<Self> {
        for (i, module) in modules.iter_mut().enumerate() {
            module.status = if i == 0 {
                ModuleStatus::Active
            } else {
                ModuleStatus::Locked
            };
        }
        Self::restore(modules)
    }

    /// Build a pathway from persisted modules, keeping their statuses.
    pub fn restore(modules: Vec<Module>) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        for module in &modules {
            if module.id.trim().is_empty() {
                return Err(EngineError::Configuration("module id is empty".into()));
            }
            if !seen.insert(module.id.as_str()) {
                return Err(EngineError::Configuration(format!(
                    "duplicate module id: {}",
                    module.id
                )));
            }
        }
        Ok(Self { modules })
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn into_modules(self) -> Vec<Module> {
        self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    fn position(&self, module_id: &str) -> EngineResult<usize> {
        self.modules
            .iter()
            .position(|m| m.id == module_id)
            .ok_or_else(|| EngineError::module_not_found(module_id))
    }

    /// The first active module, if any.
    pub fn current(&self) -> Option<&Module> {
        self.modules
            .iter()
            .find(|m| m.status == ModuleStatus::Active)
    }

    pub fn completed_count(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| m.status == ModuleStatus::Completed)
            .count()
    }

    /// Every module is completed.
    pub fn is_finished(&self) -> bool {
        !self.modules.is_empty() && self.completed_count() == self.modules.len()
    }

    /// Share of completed modules, 0-100.
    pub fn percent_complete(&self) -> u8 {
        if self.modules.is_empty() {
            return 0;
        }
        ((self.completed_count() * 100) / self.modules.len()) as u8
    }

    /// Whether the statuses follow the gated shape: a completed prefix, then
    /// at most one active module, then only locked modules.
    pub fn is_sequential(&self) -> bool {
        let mut phase = ModuleStatus::Completed;
        for module in &self.modules {
            match (phase, module.status) {
                (ModuleStatus::Completed, ModuleStatus::Completed) => {}
                (ModuleStatus::Completed, ModuleStatus::Active) => phase = ModuleStatus::Active,
                (_, ModuleStatus::Locked) => phase = ModuleStatus::Locked,
                _ => return false,
            }
        }
        true
    }
}

/// What the override does to the `locked` precondition of a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridePolicy {
    /// Override lets a locked module be completed, which then unlocks its successor.
    #[default]
    Bypass,
    /// Override only opens locked modules; completion still needs them unlocked.
    InteractOnly,
}

/// Answer to an interaction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interaction {
    pub allowed: bool,
    /// Allowed only because the override is on.
    pub via_override: bool,
    /// The catalog cannot serve this module (e.g. its quiz failed validation).
    pub blocked: bool,
    pub status: ModuleStatus,
}

/// XP the controller asks the ledger to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XpGrant {
    pub module_id: String,
    pub amount: u64,
    pub category: String,
    pub description: String,
}

/// Result of a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// Duplicate signal for a module that was already completed.
    AlreadyCompleted { module_id: String },
    Completed {
        module_id: String,
        /// The successor that moved from locked to active.
        unlocked: Option<String>,
        /// `None` when the reward is zero.
        grant: Option<XpGrant>,
        /// The last module of the pathway is now complete.
        finished: bool,
    },
}

impl CompletionOutcome {
    pub fn grant(&self) -> Option<&XpGrant> {
        match self {
            CompletionOutcome::Completed { grant, .. } => grant.as_ref(),
            CompletionOutcome::AlreadyCompleted { .. } => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, CompletionOutcome::AlreadyCompleted { .. })
    }
}

/// Progression controller: one pathway plus the administrative override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progression {
    pathway: Pathway,
    admin_override: bool,
    policy: OverridePolicy,
}

impl Progression {
    pub fn new(pathway: Pathway, policy: OverridePolicy) -> Self {
        Self {
            pathway,
            admin_override: false,
            policy,
        }
    }

    pub fn with_override(mut self, enabled: bool) -> Self {
        self.admin_override = enabled;
        self
    }

    pub fn pathway(&self) -> &Pathway {
        &self.pathway
    }

    pub fn policy(&self) -> OverridePolicy {
        self.policy
    }

    pub fn override_enabled(&self) -> bool {
        self.admin_override
    }

    /// Toggle the override. Statuses are untouched in both directions.
    pub fn set_override(&mut self, enabled: bool) {
        self.admin_override = enabled;
    }

    /// Open every module for interaction.
    pub fn unlock_all(&mut self) {
        self.set_override(true);
    }

    pub fn attempt_interact(&self, module_id: &str) -> EngineResult<Interaction> {
        let module = self
            .pathway
            .get(module_id)
            .ok_or_else(|| EngineError::module_not_found(module_id))?;
        let unlocked = module.status != ModuleStatus::Locked;
        Ok(Interaction {
            allowed: unlocked || self.admin_override,
            via_override: !unlocked && self.admin_override,
            blocked: false,
            status: module.status,
        })
    }

    /// Complete a module and unlock its successor.
    ///
    /// Completing an already-completed module is a no-op. On error the
    /// controller is left untouched.
    pub fn complete_module(
        &mut self,
        module_id: &str,
        reward_xp: u64,
    ) -> EngineResult<CompletionOutcome> {
        let idx = self.pathway.position(module_id)?;
        let module = &self.pathway.modules[idx];

        match module.status {
            ModuleStatus::Completed => {
                tracing::debug!(module_id, "duplicate completion ignored");
                return Ok(CompletionOutcome::AlreadyCompleted {
                    module_id: module_id.to_string(),
                });
            }
            ModuleStatus::Locked if !self.admin_override => {
                return Err(EngineError::InvalidTransition {
                    module_id: module_id.to_string(),
                    status: ModuleStatus::Locked,
                    reason: "predecessor not completed".into(),
                });
            }
            ModuleStatus::Locked if self.policy == OverridePolicy::InteractOnly => {
                return Err(EngineError::InvalidTransition {
                    module_id: module_id.to_string(),
                    status: ModuleStatus::Locked,
                    reason: "override opens locked modules but does not complete them".into(),
                });
            }
            _ => {}
        }

        let title = module.title.clone();
        let mut next = self.pathway.clone();
        next.modules[idx].status = ModuleStatus::Completed;

        let unlocked = match next.modules.get_mut(idx + 1) {
            Some(successor) if successor.status == ModuleStatus::Locked => {
                successor.status = ModuleStatus::Active;
                Some(successor.id.clone())
            }
            _ => None,
        };

        let grant = (reward_xp > 0).then(|| XpGrant {
            module_id: module_id.to_string(),
            amount: reward_xp,
            category: MODULE_XP_CATEGORY.to_string(),
            description: format!("Completed {title}"),
        });
        let finished = next.is_finished();

        self.pathway = next;
        tracing::info!(module_id, ?unlocked, reward_xp, "module completed");

        Ok(CompletionOutcome::Completed {
            module_id: module_id.to_string(),
            unlocked,
            grant,
            finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IconType;

    fn module(id: &str, xp: u64) -> Module {
        Module {
            id: id.into(),
            title: id.to_uppercase(),
            description: String::new(),
            icon_type: IconType::Generic,
            status: ModuleStatus::Locked,
            xp_reward: xp,
        }
    }

    fn abc() -> Progression {
        let pathway =
            Pathway::fresh(vec![module("a", 100), module("b", 150), module("c", 500)]).unwrap();
        Progression::new(pathway, OverridePolicy::Bypass)
    }

    fn statuses(p: &Progression) -> Vec<ModuleStatus> {
        p.pathway().modules().iter().map(|m| m.status).collect()
    }

    #[test]
    fn fresh_pathway_activates_first_module_only() {
        let p = abc();
        assert_eq!(
            statuses(&p),
            vec![
                ModuleStatus::Active,
                ModuleStatus::Locked,
                ModuleStatus::Locked
            ]
        );
        assert_eq!(p.pathway().current().unwrap().id, "a");
        assert!(p.pathway().is_sequential());
    }

    #[test]
    fn duplicate_ids_are_a_configuration_error() {
        let err = Pathway::fresh(vec![module("a", 0), module("a", 0)]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn completing_unlocks_successor_and_requests_grant() {
        let mut p = abc();
        let outcome = p.complete_module("a", 100).unwrap();
        assert_eq!(
            statuses(&p),
            vec![
                ModuleStatus::Completed,
                ModuleStatus::Active,
                ModuleStatus::Locked
            ]
        );
        match outcome {
            CompletionOutcome::Completed {
                unlocked,
                grant,
                finished,
                ..
            } => {
                assert_eq!(unlocked.as_deref(), Some("b"));
                assert_eq!(grant.unwrap().amount, 100);
                assert!(!finished);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn duplicate_completion_is_a_noop() {
        let mut p = abc();
        p.complete_module("a", 100).unwrap();
        let before = p.clone();
        let outcome = p.complete_module("a", 100).unwrap();
        assert!(outcome.is_noop());
        assert!(outcome.grant().is_none());
        assert_eq!(p, before);
    }

    #[test]
    fn locked_module_rejected_without_override() {
        let mut p = abc();
        let before = p.clone();
        let err = p.complete_module("b", 150).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(p, before);
    }

    #[test]
    fn unknown_module_is_not_found() {
        let p = abc();
        assert!(matches!(
            p.attempt_interact("zzz"),
            Err(EngineError::NotFound { kind: "module", .. })
        ));
    }

    #[test]
    fn override_opens_locked_modules_without_changing_status() {
        let mut p = abc();
        assert!(!p.attempt_interact("b").unwrap().allowed);
        p.set_override(true);
        let interaction = p.attempt_interact("b").unwrap();
        assert!(interaction.allowed);
        assert!(interaction.via_override);
        assert_eq!(interaction.status, ModuleStatus::Locked);
        assert_eq!(p.pathway().get("b").unwrap().status, ModuleStatus::Locked);
    }

    #[test]
    fn bypass_override_completes_locked_module_and_unlocks_next() {
        let mut p = abc();
        p.unlock_all();
        let outcome = p.complete_module("b", 150).unwrap();
        assert_eq!(outcome.grant().unwrap().amount, 150);
        assert_eq!(
            statuses(&p),
            vec![
                ModuleStatus::Active,
                ModuleStatus::Completed,
                ModuleStatus::Active
            ]
        );
    }

    #[test]
    fn interact_only_override_still_requires_sequence() {
        let pathway = Pathway::fresh(vec![module("a", 100), module("b", 150)]).unwrap();
        let mut p = Progression::new(pathway, OverridePolicy::InteractOnly).with_override(true);
        assert!(p.attempt_interact("b").unwrap().allowed);
        let err = p.complete_module("b", 150).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn disabling_override_keeps_progress() {
        let mut p = abc().with_override(true);
        p.complete_module("c", 500).unwrap();
        p.set_override(false);
        assert_eq!(p.pathway().get("c").unwrap().status, ModuleStatus::Completed);
        assert!(p.attempt_interact("c").unwrap().allowed);
        assert!(!p.attempt_interact("b").unwrap().allowed);
    }

    #[test]
    fn completing_last_module_finishes_the_pathway() {
        let mut p = abc();
        p.complete_module("a", 100).unwrap();
        p.complete_module("b", 150).unwrap();
        let outcome = p.complete_module("c", 500).unwrap();
        match outcome {
            CompletionOutcome::Completed {
                unlocked, finished, ..
            } => {
                assert!(unlocked.is_none());
                assert!(finished);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(p.pathway().percent_complete(), 100);
    }

    #[test]
    fn zero_reward_requests_no_grant() {
        let mut p = abc();
        let outcome = p.complete_module("a", 0).unwrap();
        assert!(outcome.grant().is_none());
    }

    #[test]
    fn any_sequence_of_claims_keeps_completed_prefix() {
        let ids = ["a", "b", "c"];
        // Every claim order over three modules, including repeats and rejects.
        for mask in 0..(3u32.pow(5)) {
            let mut p = abc();
            let mut m = mask;
            for _ in 0..5 {
                let id = ids[(m % 3) as usize];
                m /= 3;
                let _ = p.complete_module(id, 10);
                assert!(p.pathway().is_sequential(), "order {mask} broke gating");
                let active = p
                    .pathway()
                    .modules()
                    .iter()
                    .filter(|m| m.status == ModuleStatus::Active)
                    .count();
                assert!(active <= 1);
            }
        }
    }
}
