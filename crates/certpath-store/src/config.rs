//! certpath configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use certpath_core::playback::PlaybackConfig;
use certpath_core::EngineConfig;

use crate::feedback::FeedbackStore;
use crate::file::JsonFileStore;

/// Top-level certpath configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertpathConfig {
    /// Directory holding per-user snapshots and the feedback file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Pathway catalog TOML.
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,
    /// User id used when the CLI is not given one.
    #[serde(default = "default_user")]
    pub default_user: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./certpath-data")
}
fn default_catalog() -> PathBuf {
    PathBuf::from("catalog.toml")
}
fn default_user() -> String {
    "learner".to_string()
}

impl Default for CertpathConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            catalog: default_catalog(),
            default_user: default_user(),
            engine: EngineConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl CertpathConfig {
    /// Snapshot store rooted at `data_dir/users`.
    pub fn snapshot_store(&self) -> JsonFileStore {
        JsonFileStore::new(self.data_dir.join("users"))
    }

    pub fn feedback_store(&self) -> FeedbackStore {
        FeedbackStore::new(self.data_dir.join("feedback.json"))
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let ratio = self.engine.pass_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            anyhow::bail!("engine.pass_ratio must be in (0, 1], got {ratio}");
        }
        if self.playback.step == 0 {
            anyhow::bail!("playback.step must be at least 1");
        }
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `certpath.toml` in the current directory
/// 2. `~/.config/certpath/config.toml`
///
/// Environment variable overrides: `CERTPATH_DATA_DIR`, `CERTPATH_CATALOG`.
pub fn load_config() -> Result<CertpathConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<CertpathConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("certpath.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loading config");
            toml::from_str::<CertpathConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CertpathConfig::default(),
    };

    config.data_dir = resolve_path(&config.data_dir);
    config.catalog = resolve_path(&config.catalog);

    // Relative paths in a config file are relative to that file.
    if let Some(base) = config_path.as_deref().and_then(Path::parent) {
        if !base.as_os_str().is_empty() {
            if config.catalog.is_relative() {
                config.catalog = base.join(&config.catalog);
            }
            if config.data_dir.is_relative() {
                config.data_dir = base.join(&config.data_dir);
            }
        }
    }

    // Apply env var overrides
    if let Ok(dir) = std::env::var("CERTPATH_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(catalog) = std::env::var("CERTPATH_CATALOG") {
        config.catalog = PathBuf::from(catalog);
    }

    config.validate()?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("certpath"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use certpath_core::pathway::OverridePolicy;
    use tempfile::TempDir;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_CERTPATH_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_CERTPATH_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_CERTPATH_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no_close_${brace"), "no_close_${brace");
        std::env::remove_var("_CERTPATH_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = CertpathConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./certpath-data"));
        assert_eq!(config.default_user, "learner");
        assert_eq!(config.engine.override_policy, OverridePolicy::Bypass);
        assert_eq!(config.playback.step, 5);
        config.validate().unwrap();
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
data_dir = "/var/lib/certpath"
catalog = "/etc/certpath/catalog.toml"
default_user = "coach"

[engine]
pass_ratio = 0.75
quiz_reward = 100
override_policy = "interact_only"

[[engine.tiers]]
name = "Starter"
minimum_lifetime_earned = 0

[[engine.tiers]]
name = "Pro"
minimum_lifetime_earned = 1000

[playback]
period_ms = 250
step = 10
"#;
        let config: CertpathConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_user, "coach");
        assert_eq!(config.engine.pass_ratio, 0.75);
        assert_eq!(config.engine.quiz_reward, Some(100));
        assert_eq!(config.engine.override_policy, OverridePolicy::InteractOnly);
        assert_eq!(config.engine.tiers.tiers().len(), 2);
        assert_eq!(config.playback.period_ms, 250);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("certpath.toml");
        std::fs::write(&path, "data_dir = \"state\"\ncatalog = \"path.toml\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.catalog, dir.path().join("path.toml"));
    }

    #[test]
    fn invalid_pass_ratio_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("certpath.toml");
        std::fs::write(&path, "[engine]\npass_ratio = 1.5\n").unwrap();

        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("pass_ratio"));
    }
}
