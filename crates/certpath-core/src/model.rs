//! Core data model types for certpath.
//!
//! Modules and quizzes are the static shape of a training pathway; module
//! status is the only part that changes as a learner progresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One unit of the training pathway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Stable identifier, unique within the pathway.
    pub id: String,
    /// Display title. Quizzes bind to modules by this title.
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Selects which completion mechanism applies.
    #[serde(default)]
    pub icon_type: IconType,
    /// Lifecycle state.
    #[serde(default)]
    pub status: ModuleStatus,
    /// XP granted on completion.
    #[serde(default)]
    pub xp_reward: u64,
}

/// Module lifecycle state. Transitions only move forward:
///
/// ```text
/// locked → active → completed
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    #[default]
    Locked,
    Active,
    Completed,
}

impl ModuleStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of module kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    Video,
    Quiz,
    Trophy,
    #[default]
    Generic,
}

impl IconType {
    /// The completion mechanism this kind of module uses.
    pub const fn mechanism(self) -> Mechanism {
        match self {
            IconType::Video => Mechanism::Video,
            IconType::Quiz => Mechanism::Quiz,
            IconType::Trophy | IconType::Generic => Mechanism::Claim,
        }
    }
}

impl fmt::Display for IconType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IconType::Video => write!(f, "video"),
            IconType::Quiz => write!(f, "quiz"),
            IconType::Trophy => write!(f, "trophy"),
            IconType::Generic => write!(f, "generic"),
        }
    }
}

impl FromStr for IconType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(IconType::Video),
            "quiz" => Ok(IconType::Quiz),
            "trophy" | "certification" => Ok(IconType::Trophy),
            "generic" | "" => Ok(IconType::Generic),
            other => Err(format!("unknown icon type: {other}")),
        }
    }
}

/// How a module reaches `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// A passing quiz attempt.
    Quiz,
    /// The video gate reaching 100%.
    Video,
    /// A direct claim action.
    Claim,
}

impl Mechanism {
    pub const fn as_str(self) -> &'static str {
        match self {
            Mechanism::Quiz => "quiz",
            Mechanism::Video => "video",
            Mechanism::Claim => "claim",
        }
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Prompt text.
    pub question: String,
    /// Answer options, at least two.
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
}

/// A named, ordered question set bound to the module with the same title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    /// Title of the module this quiz belongs to.
    pub title: String,
    /// Questions in presentation order.
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}
