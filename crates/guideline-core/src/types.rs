use crate::error::GuidelineError;
use crate::paths::is_valid_identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// Identifier of a guideline document, e.g. `git-workflow`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Result<Self, GuidelineError> {
        let id = id.into();
        if !is_valid_identifier(&id) {
            return Err(GuidelineError::InvalidDocumentId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = GuidelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        DocumentId::new(s)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl std::str::FromStr for DocumentId {
    type Err = GuidelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::new(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// TaskType
// ---------------------------------------------------------------------------

/// A category of work used to select guideline documents.
///
/// The known set is the key set of the active mapping; `all` is reserved for
/// the union of every mapped document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskType(String);

impl TaskType {
    pub const ALL: &'static str = "all";

    pub fn new(name: impl Into<String>) -> Result<Self, GuidelineError> {
        let name = name.into();
        if !is_valid_identifier(&name) {
            return Err(GuidelineError::InvalidTaskType(name));
        }
        Ok(Self(name))
    }

    pub fn all() -> Self {
        Self(Self::ALL.to_string())
    }

    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskType {
    type Error = GuidelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TaskType::new(s)
    }
}

impl From<TaskType> for String {
    fn from(t: TaskType) -> Self {
        t.0
    }
}

impl std::str::FromStr for TaskType {
    type Err = GuidelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::new(s)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// Precedence level a document was served from. Declaration order is
/// precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Local,
    Cache,
    Remote,
}

impl SourceKind {
    pub fn all() -> &'static [SourceKind] {
        &[SourceKind::Local, SourceKind::Cache, SourceKind::Remote]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Cache => "cache",
            SourceKind::Remote => "remote",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_rejects_path_traversal() {
        assert!(DocumentId::new("../secrets").is_err());
        assert!(DocumentId::new("git-workflow").is_ok());
    }

    #[test]
    fn task_type_parse_errors_are_typed() {
        let err = "Not Valid".parse::<TaskType>().unwrap_err();
        assert!(matches!(err, GuidelineError::InvalidTaskType(_)));
    }

    #[test]
    fn task_type_all_is_reserved_key() {
        assert!(TaskType::all().is_all());
        assert!(!TaskType::new("git").unwrap().is_all());
    }

    #[test]
    fn document_id_yaml_validates() {
        let ok: Vec<DocumentId> = serde_yaml::from_str("- git-workflow\n- testing\n").unwrap();
        assert_eq!(ok[1].as_str(), "testing");
        assert!(serde_yaml::from_str::<Vec<DocumentId>>("- Bad_Id\n").is_err());
    }

    #[test]
    fn source_kind_precedence_order() {
        let mut kinds = vec![SourceKind::Remote, SourceKind::Local, SourceKind::Cache];
        kinds.sort();
        assert_eq!(kinds, SourceKind::all());
    }
}
