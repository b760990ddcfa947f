use crate::bootstrap::{ActionKind, CheckKind, FailurePolicy, StepDefinition};
use crate::error::Result;
use crate::paths;
use crate::types::{DocumentId, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

pub const DEFAULT_TAG: &str = "main";
/// Placeholder origin written into new configs. Projects point
/// `origin.base_url` (or `--origin`) at their own guideline repository.
pub const DEFAULT_ORIGIN: &str = "https://raw.githubusercontent.com/guideline-kit/guidelines";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OriginConfig
// ---------------------------------------------------------------------------

/// Where documents are fetched from when neither a local override nor a
/// cached copy exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tag: default_tag(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl OriginConfig {
    /// `{base_url}/{tag}/{id}.md`
    pub fn document_url(&self, id: &DocumentId) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.tag,
            paths::document_file_name(id.as_str())
        )
    }
}

// ---------------------------------------------------------------------------
// DocumentEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Explicit remote URL; overrides the one derived from `origin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DocumentEntry {
    fn new(id: &str, title: &str) -> Self {
        Self {
            // Built-in ids are literals checked by the tests below.
            id: DocumentId::new(id).expect("built-in document id"),
            title: Some(title.to_string()),
            url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Document registry. Its order is the canonical order used for `all`.
    #[serde(default = "default_documents")]
    pub documents: Vec<DocumentEntry>,
    #[serde(default = "default_tasks")]
    pub tasks: BTreeMap<TaskType, Vec<DocumentId>>,
    #[serde(default = "default_bootstrap")]
    pub bootstrap: Vec<StepDefinition>,
}

fn default_version() -> u32 {
    1
}

fn default_cache_dir() -> String {
    paths::CACHE_DIR.to_string()
}

fn default_documents() -> Vec<DocumentEntry> {
    vec![
        DocumentEntry::new("general-coding", "General coding standards"),
        DocumentEntry::new("python-standards", "Python standards"),
        DocumentEntry::new("python-testing", "Python testing"),
        DocumentEntry::new("git-workflow", "Git workflow"),
        DocumentEntry::new("pre-commit-checklist", "Pre-commit checklist"),
        DocumentEntry::new("refactoring", "Refactoring"),
        DocumentEntry::new("code-review", "Code review"),
        DocumentEntry::new("project-layout", "New repository layout"),
    ]
}

fn default_tasks() -> BTreeMap<TaskType, Vec<DocumentId>> {
    let table: &[(&str, &[&str])] = &[
        ("python", &["general-coding", "python-standards", "python-testing"]),
        ("git", &["git-workflow", "pre-commit-checklist"]),
        ("refactor", &["general-coding", "refactoring", "python-testing"]),
        ("review", &["code-review", "pre-commit-checklist"]),
        ("new-repo", &["project-layout", "git-workflow", "python-standards"]),
    ];
    table
        .iter()
        .map(|(task, ids)| {
            (
                TaskType::new(*task).expect("built-in task type"),
                ids.iter()
                    .map(|id| DocumentId::new(*id).expect("built-in document id"))
                    .collect(),
            )
        })
        .collect()
}

fn default_bootstrap() -> Vec<StepDefinition> {
    vec![
        StepDefinition {
            name: "seed-guidelines".to_string(),
            check: CheckKind::DocumentsCached,
            action: ActionKind::FetchDocuments,
            on_failure: FailurePolicy::Continue,
            timeout_seconds: 300,
        },
        StepDefinition {
            name: "pre-commit".to_string(),
            check: CheckKind::CommandAvailable {
                program: "pre-commit".to_string(),
            },
            action: ActionKind::Shell {
                command: "pipx install pre-commit || python3 -m pip install --user pre-commit"
                    .to_string(),
            },
            on_failure: FailurePolicy::Continue,
            timeout_seconds: 300,
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            origin: OriginConfig::default(),
            cache_dir: default_cache_dir(),
            documents: default_documents(),
            tasks: default_tasks(),
            bootstrap: default_bootstrap(),
        }
    }
}

impl Config {
    pub fn exists(root: &Path) -> bool {
        paths::config_path(root).exists()
    }

    /// Load `.guidelines/config.yaml`, falling back to the built-in defaults
    /// when the project has no config file.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// True while `origin.base_url` is still the placeholder default.
    pub fn uses_placeholder_origin(&self) -> bool {
        self.origin.base_url.trim_end_matches('/') == DEFAULT_ORIGIN
    }

    pub fn cache_dir(&self, root: &Path) -> Result<PathBuf> {
        paths::resolve_dir(root, &self.cache_dir)
    }

    pub fn document(&self, id: &DocumentId) -> Option<&DocumentEntry> {
        self.documents.iter().find(|d| &d.id == id)
    }

    /// Validate the config for mistakes. `Error`-level entries make the
    /// mapping unusable; `Warning`-level entries are informational.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let mut registered = HashSet::new();
        for doc in &self.documents {
            if !registered.insert(&doc.id) {
                warnings.push(ConfigWarning::error(format!(
                    "document '{}' is registered more than once",
                    doc.id
                )));
            }
        }

        let mut referenced = HashSet::new();
        for (task, ids) in &self.tasks {
            if task.is_all() {
                warnings.push(ConfigWarning::error(
                    "task type 'all' is reserved and cannot be mapped explicitly",
                ));
            }
            if ids.is_empty() {
                warnings.push(ConfigWarning::error(format!(
                    "task type '{task}' maps to no documents"
                )));
            }
            let mut seen = HashSet::new();
            for id in ids {
                if !seen.insert(id) {
                    warnings.push(ConfigWarning::error(format!(
                        "task type '{task}' lists document '{id}' more than once"
                    )));
                }
                if !registered.contains(id) {
                    warnings.push(ConfigWarning::error(format!(
                        "task type '{task}' references unknown document '{id}'"
                    )));
                }
                referenced.insert(id);
            }
        }

        for doc in &self.documents {
            if !referenced.contains(&doc.id) {
                warnings.push(ConfigWarning::warning(format!(
                    "document '{}' is not referenced by any task type",
                    doc.id
                )));
            }
        }

        if self.origin.timeout_seconds == 0 {
            warnings.push(ConfigWarning::error(
                "origin.timeout_seconds must be greater than zero",
            ));
        }
        if !self.origin.base_url.starts_with("http://")
            && !self.origin.base_url.starts_with("https://")
        {
            warnings.push(ConfigWarning::warning(format!(
                "origin.base_url '{}' is not an http(s) URL",
                self.origin.base_url
            )));
        }

        let mut step_names = HashSet::new();
        for step in &self.bootstrap {
            if !step_names.insert(step.name.as_str()) {
                warnings.push(ConfigWarning::error(format!(
                    "bootstrap step '{}' is defined more than once",
                    step.name
                )));
            }
            let empty_command = match (&step.check, &step.action) {
                (_, ActionKind::Shell { command }) if command.trim().is_empty() => true,
                (CheckKind::CommandSucceeds { command }, _) if command.trim().is_empty() => true,
                _ => false,
            };
            if empty_command {
                warnings.push(ConfigWarning::error(format!(
                    "bootstrap step '{}' has an empty command",
                    step.name
                )));
            }
            if step.timeout_seconds == 0 {
                warnings.push(ConfigWarning::warning(format!(
                    "bootstrap step '{}' has timeout_seconds 0 and will time out immediately",
                    step.name
                )));
            }
        }

        warnings
    }

    /// `Error`-level messages from [`Config::validate`].
    pub fn errors(&self) -> Vec<String> {
        self.validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
