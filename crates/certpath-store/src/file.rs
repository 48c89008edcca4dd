//! JSON-file snapshot store: one pretty-printed file per user.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use certpath_core::traits::{Snapshot, SnapshotStore, SNAPSHOT_VERSION};

use crate::error::StoreError;

/// Stores each user's snapshot as `<data_dir>/<user_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a user's snapshot file.
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(format!("{user_id}.json")))
    }

    /// User ids with a stored snapshot, sorted.
    pub async fn users(&self) -> Result<Vec<String>> {
        let mut users = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(users),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to list {}", self.dir.display()))
            }
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    users.push(stem.to_string());
                }
            }
        }
        users.sort();
        Ok(users)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn load(&self, user_id: &str) -> Result<Option<Snapshot>> {
        let path = self.path_for(user_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read snapshot from {}", path.display()))
            }
        };
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse snapshot JSON: {}", path.display()))?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            }
            .into());
        }
        Ok(Some(snapshot))
    }

    async fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<()> {
        let path = self.path_for(user_id)?;
        let json = serde_json::to_vec_pretty(snapshot).context("failed to serialize snapshot")?;
        write_atomic(&path, &json).await?;
        tracing::debug!(user_id, path = %path.display(), "snapshot saved");
        Ok(())
    }
}

/// Replace `path` with `bytes` via a sibling temp file and a rename, so a
/// reader sees either the old or the new content.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file path: {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}

fn validate_user_id(user_id: &str) -> Result<(), StoreError> {
    let ok = !user_id.is_empty()
        && !user_id.starts_with('.')
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidUserId(user_id.to_string()))
    }
}
