//! Learner feedback store backed by a single JSON file.
//!
//! The admin console reads and moderates these records; every write replaces
//! the whole file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::file::write_atomic;

/// Moderation state of a feedback record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Open,
    Reviewed,
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Open => "open",
            FeedbackStatus::Reviewed => "reviewed",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(FeedbackStatus::Open),
            "reviewed" => Ok(FeedbackStatus::Reviewed),
            "resolved" => Ok(FeedbackStatus::Resolved),
            _ => Err(StoreError::UnknownStatus(s.to_string())),
        }
    }
}

/// One piece of learner feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub author: String,
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub status: FeedbackStatus,
    #[serde(default)]
    pub flagged: bool,
    pub created_at: DateTime<Utc>,
}

/// Criteria for [`FeedbackStore::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct FeedbackFilter {
    pub status: Option<FeedbackStatus>,
    pub category: Option<String>,
    pub flagged: Option<bool>,
}

impl FeedbackFilter {
    pub fn matches(&self, record: &FeedbackRecord) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self
                .category
                .as_deref()
                .is_none_or(|c| record.category.eq_ignore_ascii_case(c))
            && self.flagged.is_none_or(|f| record.flagged == f)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FeedbackFile {
    #[serde(default)]
    records: Vec<FeedbackRecord>,
}

/// Feedback records kept in one JSON file.
pub struct FeedbackStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record new feedback. Returns the stored record.
    pub async fn add(&self, author: &str, category: &str, message: &str) -> Result<FeedbackRecord> {
        let message = message.trim();
        if message.is_empty() {
            return Err(StoreError::EmptyMessage.into());
        }

        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        let record = FeedbackRecord {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.to_string(),
            category: category.to_string(),
            message: message.to_string(),
            status: FeedbackStatus::Open,
            flagged: false,
            created_at: Utc::now(),
        };
        file.records.push(record.clone());
        self.write(&file).await?;

        tracing::info!(id = %record.id, category, "feedback recorded");
        Ok(record)
    }

    /// Records matching `filter`, newest first.
    pub async fn list(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        let file = self.read().await?;
        let mut records: Vec<_> = file
            .records
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    pub async fn set_status(&self, id: &str, status: FeedbackStatus) -> Result<FeedbackRecord> {
        self.update(id, |r| r.status = status).await
    }

    pub async fn set_flagged(&self, id: &str, flagged: bool) -> Result<FeedbackRecord> {
        self.update(id, |r| r.flagged = flagged).await
    }

    /// Delete a record. Returns the removed record.
    pub async fn remove(&self, id: &str) -> Result<FeedbackRecord> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        let idx = file
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::FeedbackNotFound(id.to_string()))?;
        let removed = file.records.remove(idx);
        self.write(&file).await?;
        tracing::info!(id, "feedback removed");
        Ok(removed)
    }

    async fn update(&self, id: &str, f: impl FnOnce(&mut FeedbackRecord)) -> Result<FeedbackRecord> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        let record = file
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::FeedbackNotFound(id.to_string()))?;
        f(record);
        let updated = record.clone();
        self.write(&file).await?;
        tracing::info!(id, status = %updated.status, flagged = updated.flagged, "feedback updated");
        Ok(updated)
    }

    async fn read(&self) -> Result<FeedbackFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("failed to parse feedback file: {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FeedbackFile::default()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to read feedback file: {}", self.path.display())),
        }
    }

    async fn write(&self, file: &FeedbackFile) -> Result<()> {
        let json = serde_json::to_vec_pretty(file).context("failed to serialize feedback")?;
        write_atomic(&self.path, &json).await
    }
}
