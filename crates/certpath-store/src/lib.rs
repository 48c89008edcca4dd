//! certpath-store: persistence and configuration for certpath.
//!
//! Implements the `SnapshotStore` trait as a JSON file per user and as an
//! in-memory map, keeps the learner feedback file, and loads `certpath.toml`.

pub mod config;
pub mod error;
pub mod feedback;
pub mod file;
pub mod memory;

pub use config::{load_config, load_config_from, CertpathConfig};
pub use error::StoreError;
pub use feedback::{FeedbackFilter, FeedbackRecord, FeedbackStatus, FeedbackStore};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
