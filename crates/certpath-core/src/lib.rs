//! certpath-core: Progression, quiz, video-gate, and ledger engine.
//!
//! This crate holds the rules of the training pathway: module gating and
//! completion, quiz scoring, watch-progress gating, the currency ledger with
//! its tiers, and the per-user session that persists every transition before
//! committing it.

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod model;
pub mod pathway;
pub mod playback;
pub mod quiz;
pub mod registry;
pub mod session;
pub mod tier;
pub mod traits;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{EngineError, EngineResult};
pub use session::{EngineConfig, Session};
