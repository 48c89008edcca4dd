//! Subcommand implementations and the plumbing they share.

pub mod feedback;
pub mod init;
pub mod ledger;
pub mod progress;
pub mod quiz;
pub mod status;
pub mod validate;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use certpath_core::catalog::parse_catalog;
use certpath_core::traits::{EngineEvent, EventSink};
use certpath_core::Session;
use certpath_store::{load_config_from, CertpathConfig};

/// Global options shared by every subcommand.
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub user: Option<String>,
}

impl Context {
    pub fn config(&self) -> Result<CertpathConfig> {
        load_config_from(self.config_path.as_deref())
    }

    pub fn user_id(&self, config: &CertpathConfig) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| config.default_user.clone())
    }

    /// Load config and catalog, then open the learner's session.
    pub async fn session(&self) -> Result<(CertpathConfig, Arc<Session>)> {
        let config = self.config()?;
        let catalog = parse_catalog(&config.catalog)
            .with_context(|| format!("failed to load catalog {}", config.catalog.display()))?;
        let user_id = self.user_id(&config);
        tracing::debug!(
            user_id = %user_id,
            catalog = %catalog.id,
            data_dir = %config.data_dir.display(),
            "opening session"
        );

        let session = Session::open(
            &user_id,
            Arc::new(catalog),
            config.engine.clone(),
            Arc::new(config.snapshot_store()),
        )
        .await
        .with_context(|| format!("failed to open session for {user_id}"))?
        .with_events(Arc::new(ConsoleSink));

        Ok((config, Arc::new(session)))
    }
}

/// Prints engine events as they are committed.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn on_event(&self, _user_id: &str, event: &EngineEvent) {
        match event {
            EngineEvent::ModuleCompleted { module_id } => println!("  Completed: {module_id}"),
            EngineEvent::ModuleUnlocked { module_id } => println!("  Unlocked: {module_id}"),
            EngineEvent::PathwayFinished => println!("  Pathway finished!"),
            EngineEvent::XpGranted {
                amount,
                transaction_id,
            } => println!("  +{amount} XP [{transaction_id}]"),
            EngineEvent::PendingPosted {
                amount,
                transaction_id,
            } => println!("  +{amount} XP pending verification [{transaction_id}]"),
            EngineEvent::PendingResolved {
                transaction_id,
                resolution,
            } => println!("  Resolved {transaction_id}: {resolution:?}"),
            EngineEvent::Spent {
                amount,
                transaction_id,
            } => println!("  -{amount} XP [{transaction_id}]"),
            EngineEvent::OverrideToggled { enabled } => {
                println!("  Override {}", if *enabled { "ON" } else { "OFF" })
            }
            EngineEvent::TierReached { tier } => println!("  Tier reached: {tier}"),
        }
    }
}
