use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuidelineError {
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("invalid task type '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidTaskType(String),

    #[error("invalid document id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidDocumentId(String),

    #[error("invalid guideline mapping: {0}")]
    InvalidMapping(String),

    #[error("document unavailable: {id} ({reason})")]
    DocumentUnavailable { id: String, reason: String },

    #[error("timed out after {seconds}s fetching {url}")]
    NetworkTimeout { url: String, seconds: u64 },

    #[error("step '{step}' failed: {reason}")]
    StepExecutionFailed { step: String, reason: String },

    #[error("command timed out after {seconds}s")]
    StepTimeout { seconds: u64 },

    #[error("command exited with {code}: {stderr}")]
    CommandFailed { code: String, stderr: String },

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl GuidelineError {
    /// True for errors that mean "this document could not be obtained right
    /// now" as opposed to a programming or configuration mistake.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            GuidelineError::DocumentUnavailable { .. } | GuidelineError::NetworkTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GuidelineError>;
