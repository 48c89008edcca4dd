//! TOML pathway catalog parser.
//!
//! A catalog declares the ordered modules of a pathway and the quizzes bound
//! to them. Malformed quizzes do not fail the whole catalog: they are blocked
//! and the module they belong to cannot be started.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::model::{IconType, Module, ModuleStatus, Quiz, QuizQuestion};
use crate::pathway::Pathway;
use crate::quiz::validate_quiz;

#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    pathway: TomlPathwayHeader,
    #[serde(default)]
    modules: Vec<TomlModule>,
    #[serde(default)]
    quizzes: Vec<TomlQuiz>,
}

#[derive(Debug, Deserialize)]
struct TomlPathwayHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlModule {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    xp_reward: u64,
}

#[derive(Debug, Deserialize)]
struct TomlQuiz {
    title: String,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    question: String,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: usize,
}

/// A validated pathway definition.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub id: String,
    pub name: String,
    pub description: String,
    modules: Vec<Module>,
    /// Playable quizzes keyed by module title.
    quizzes: BTreeMap<String, Quiz>,
    /// Quizzes that failed validation, keyed by title, with the reason.
    blocked: BTreeMap<String, String>,
}

impl Catalog {
    /// Build a catalog. Duplicate or empty module ids fail the whole catalog;
    /// invalid quizzes are blocked individually.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        modules: Vec<Module>,
        quizzes: Vec<Quiz>,
    ) -> EngineResult<Self> {
        let modules = Pathway::fresh(modules)?.into_modules();

        let mut playable = BTreeMap::new();
        let mut blocked = BTreeMap::new();
        for quiz in quizzes {
            if playable.contains_key(&quiz.title) || blocked.contains_key(&quiz.title) {
                blocked.insert(quiz.title.clone(), "duplicate quiz title".to_string());
                playable.remove(&quiz.title);
                continue;
            }
            match validate_quiz(&quiz) {
                Ok(()) => {
                    playable.insert(quiz.title.clone(), quiz);
                }
                Err(e) => {
                    tracing::warn!(title = %quiz.title, "quiz blocked: {e}");
                    blocked.insert(quiz.title.clone(), e.to_string());
                }
            }
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            modules,
            quizzes: playable,
            blocked,
        })
    }

    /// Modules in their initial state.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn fresh_pathway(&self) -> EngineResult<Pathway> {
        Pathway::fresh(self.modules.clone())
    }

    pub fn quizzes(&self) -> impl Iterator<Item = &Quiz> {
        self.quizzes.values()
    }

    /// Blocked quiz titles and why.
    pub fn blocked(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blocked.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The quiz bound to a module, by title.
    pub fn quiz_for(&self, module: &Module) -> EngineResult<&Quiz> {
        if let Some(reason) = self.blocked.get(&module.title) {
            return Err(EngineError::Configuration(format!(
                "quiz for module {} is unavailable: {reason}",
                module.id
            )));
        }
        self.quizzes.get(&module.title).ok_or_else(|| {
            EngineError::Configuration(format!("no quiz bound to module {}", module.id))
        })
    }

    /// Whether a module can be offered at all.
    pub fn is_offerable(&self, module: &Module) -> bool {
        module.icon_type != IconType::Quiz || self.quiz_for(module).is_ok()
    }
}

/// Parse a catalog file.
pub fn parse_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a catalog from a TOML string (useful for testing).
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let modules = parsed
        .modules
        .into_iter()
        .map(|m| {
            let icon_type = m
                .icon
                .as_deref()
                .unwrap_or("generic")
                .parse()
                .map_err(|e: String| anyhow::anyhow!("module {}: {}", m.id, e))?;
            Ok(Module {
                id: m.id,
                title: m.title,
                description: m.description,
                icon_type,
                status: ModuleStatus::Locked,
                xp_reward: m.xp_reward,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let quizzes = parsed
        .quizzes
        .into_iter()
        .map(|q| Quiz {
            title: q.title,
            questions: q
                .questions
                .into_iter()
                .map(|question| QuizQuestion {
                    question: question.question,
                    options: question.options,
                    correct_answer: question.correct_answer,
                })
                .collect(),
        })
        .collect();

    let mut catalog = Catalog::new(parsed.pathway.id, parsed.pathway.name, modules, quizzes)
        .with_context(|| format!("invalid catalog: {}", source_path.display()))?;
    catalog.description = parsed.pathway.description;
    Ok(catalog)
}

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The module ID (if applicable).
    pub module_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a catalog for problems that do not prevent loading it.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if catalog.modules.is_empty() {
        warnings.push(ValidationWarning {
            module_id: None,
            message: "pathway has no modules".into(),
        });
    }

    for module in &catalog.modules {
        if module.icon_type == IconType::Quiz {
            if let Err(e) = catalog.quiz_for(module) {
                warnings.push(ValidationWarning {
                    module_id: Some(module.id.clone()),
                    message: e.to_string(),
                });
            }
        }
        if module.xp_reward == 0 {
            warnings.push(ValidationWarning {
                module_id: Some(module.id.clone()),
                message: "xp_reward is 0; completing it grants nothing".into(),
            });
        }
    }

    // Quizzes whose title matches no module are never reachable
    let titles: HashSet<&str> = catalog.modules.iter().map(|m| m.title.as_str()).collect();
    for title in catalog.quizzes.keys().chain(catalog.blocked.keys()) {
        if !titles.contains(title.as_str()) {
            warnings.push(ValidationWarning {
                module_id: None,
                message: format!("quiz '{title}' matches no module title"),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) const VALID_TOML: &str = r#"
[pathway]
id = "sprint-cert"
name = "Sprint Coach Certification"
description = "Foundations of sprint coaching"

[[modules]]
id = "intro"
title = "Welcome to the Track"
icon = "video"
xp_reward = 100

[[modules]]
id = "mechanics"
title = "Sprint Mechanics"
icon = "quiz"
xp_reward = 250

[[modules]]
id = "certified"
title = "Certification"
icon = "trophy"
xp_reward = 500

[[quizzes]]
title = "Sprint Mechanics"

[[quizzes.questions]]
question = "Where should the foot strike during max velocity?"
options = ["Heel", "Under the hips", "Far in front"]
correct_answer = 1

[[quizzes.questions]]
question = "Arm swing should be driven from the..."
options = ["Shoulder", "Elbow", "Wrist"]
correct_answer = 0
"#;

    #[test]
    fn parse_valid_catalog() {
        let catalog = parse_catalog_str(VALID_TOML, &PathBuf::from("c.toml")).unwrap();
        assert_eq!(catalog.id, "sprint-cert");
        assert_eq!(catalog.modules().len(), 3);
        assert_eq!(catalog.modules()[0].status, ModuleStatus::Active);
        assert_eq!(catalog.modules()[1].icon_type, IconType::Quiz);
        let quiz = catalog.quiz_for(&catalog.modules()[1]).unwrap();
        assert_eq!(quiz.questions.len(), 2);
        assert!(validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn out_of_range_answer_blocks_the_quiz() {
        let toml = VALID_TOML.replace("correct_answer = 0", "correct_answer = 7");
        let catalog = parse_catalog_str(&toml, &PathBuf::from("c.toml")).unwrap();
        let module = &catalog.modules()[1];
        let err = catalog.quiz_for(module).unwrap_err();
        assert!(err.is_configuration());
        assert!(!catalog.is_offerable(module));
        assert_eq!(catalog.blocked().count(), 1);
        assert!(validate_catalog(&catalog)
            .iter()
            .any(|w| w.module_id.as_deref() == Some("mechanics")));
    }

    #[test]
    fn duplicate_module_ids_fail_the_catalog() {
        let toml = VALID_TOML.replace("id = \"certified\"", "id = \"intro\"");
        let err = parse_catalog_str(&toml, &PathBuf::from("c.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate module id"));
    }

    #[test]
    fn unknown_icon_is_an_error() {
        let toml = VALID_TOML.replace("icon = \"trophy\"", "icon = \"hologram\"");
        assert!(parse_catalog_str(&toml, &PathBuf::from("c.toml")).is_err());
    }

    #[test]
    fn orphan_quiz_and_missing_quiz_warn() {
        let toml = VALID_TOML.replace(
            "title = \"Sprint Mechanics\"\n\n[[quizzes.questions]]",
            "title = \"Hurdles\"\n\n[[quizzes.questions]]",
        );
        let catalog = parse_catalog_str(&toml, &PathBuf::from("c.toml")).unwrap();
        let warnings = validate_catalog(&catalog);
        assert!(warnings.iter().any(|w| w.message.contains("no quiz bound")));
        assert!(warnings.iter().any(|w| w.message.contains("'Hurdles'")));
    }

    #[test]
    fn parse_malformed_toml() {
        let result = parse_catalog_str("[pathway\nid=", &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, VALID_TOML).unwrap();
        let catalog = parse_catalog(&path).unwrap();
        assert_eq!(catalog.name, "Sprint Coach Certification");
    }
}
