//! Idempotent, best-effort setup passes.
//!
//! A bootstrap run walks an ordered list of steps. Each step first evaluates
//! its idempotency check; a satisfied check skips the step without invoking
//! its action. A failing action either lets the run continue or aborts it,
//! depending on the step's [`FailurePolicy`].
//!
//! Per-step state machine:
//!
//! ```text
//! Pending -> Checked -> Skipped
//!                    -> Executing -> Succeeded
//!                                 -> Failed
//! ```
//!
//! The version marker is written after the pass unless the run aborted or
//! every step failed.

use crate::error::{GuidelineError, Result};
use crate::loader::DocumentLoader;
use crate::paths;
use crate::process;
use crate::types::DocumentId;
use crate::version::VersionMarker;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Step definitions (config)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Continue,
    Abort,
}

/// Predicate deciding whether a step is already satisfied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckKind {
    /// Never satisfied; the action always runs.
    #[default]
    Never,
    PathExists {
        path: String,
    },
    CommandAvailable {
        program: String,
    },
    CommandSucceeds {
        command: String,
    },
    /// Every registered document has a cached copy.
    DocumentsCached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Shell { command: String },
    FetchDocuments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDefinition {
    pub name: String,
    #[serde(default)]
    pub check: CheckKind,
    pub action: ActionKind,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    #[serde(default = "default_step_timeout")]
    pub timeout_seconds: u64,
}

fn default_step_timeout() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// StepState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Checked,
    Skipped,
    Executing,
    Succeeded,
    Failed,
}

impl StepState {
    pub fn as_str(self) -> &'static str {
        match self {
            StepState::Pending => "pending",
            StepState::Checked => "checked",
            StepState::Skipped => "skipped",
            StepState::Executing => "executing",
            StepState::Succeeded => "succeeded",
            StepState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepState::Skipped | StepState::Succeeded | StepState::Failed
        )
    }

    pub fn can_advance_to(self, next: StepState) -> bool {
        use StepState::*;
        matches!(
            (self, next),
            (Pending, Checked)
                | (Checked, Skipped)
                | (Checked, Executing)
                | (Executing, Succeeded)
                | (Executing, Failed)
        )
    }

    fn advance(self, step: &str, next: StepState) -> StepState {
        debug_assert!(
            self.can_advance_to(next),
            "invalid step transition {self} -> {next}"
        );
        tracing::debug!(step, from = %self, to = %next, "step transition");
        next
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BootstrapStep (runtime)
// ---------------------------------------------------------------------------

pub type StepCheck<'a> = Box<dyn Fn() -> bool + 'a>;
pub type StepAction<'a> = Box<dyn FnMut() -> Result<()> + 'a>;

pub struct BootstrapStep<'a> {
    name: String,
    on_failure: FailurePolicy,
    check: StepCheck<'a>,
    action: StepAction<'a>,
}

impl<'a> BootstrapStep<'a> {
    /// A step whose check is never satisfied and whose failures are
    /// tolerated.
    pub fn new(name: impl Into<String>, action: impl FnMut() -> Result<()> + 'a) -> Self {
        Self {
            name: name.into(),
            on_failure: FailurePolicy::Continue,
            check: Box::new(|| false),
            action: Box::new(action),
        }
    }

    pub fn with_check(mut self, check: impl Fn() -> bool + 'a) -> Self {
        self.check = Box::new(check);
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for BootstrapStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapStep")
            .field("name", &self.name)
            .field("on_failure", &self.on_failure)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Building steps from config
// ---------------------------------------------------------------------------

/// How a `fetch_documents` action treats documents that are already cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Bootstrap: fetch only documents without a cached copy.
    MissingOnly,
    /// Sync: re-fetch every document and replace the cached copy.
    Refresh,
}

/// Everything configured steps need from the surrounding run.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub root: &'a Path,
    pub loader: &'a DocumentLoader,
    pub documents: &'a [DocumentId],
    pub fetch_mode: FetchMode,
}

pub fn build_steps<'a>(defs: &'a [StepDefinition], ctx: StepContext<'a>) -> Vec<BootstrapStep<'a>> {
    defs.iter().map(|def| build_step(def, ctx)).collect()
}

fn build_step<'a>(def: &'a StepDefinition, ctx: StepContext<'a>) -> BootstrapStep<'a> {
    let timeout = Duration::from_secs(def.timeout_seconds);

    let check: StepCheck<'a> = match &def.check {
        CheckKind::Never => Box::new(|| false),
        CheckKind::PathExists { path } => Box::new(move || {
            paths::resolve_dir(ctx.root, path)
                .map(|p| p.exists())
                .unwrap_or(false)
        }),
        CheckKind::CommandAvailable { program } => {
            Box::new(move || process::command_available(program))
        }
        CheckKind::CommandSucceeds { command } => {
            Box::new(move || process::run_shell(command, ctx.root, timeout).is_ok())
        }
        CheckKind::DocumentsCached => Box::new(move || {
            ctx.fetch_mode == FetchMode::MissingOnly
                && ctx.documents.iter().all(|id| ctx.loader.is_cached(id))
        }),
    };

    let action: StepAction<'a> = match &def.action {
        ActionKind::Shell { command } => Box::new(move || {
            let out = process::run_shell(command, ctx.root, timeout)?;
            if !out.stdout.trim().is_empty() {
                tracing::debug!(step = %def.name, stdout = %out.stdout.trim(), "step output");
            }
            Ok(())
        }),
        ActionKind::FetchDocuments => Box::new(move || fetch_documents(&def.name, ctx)),
    };

    BootstrapStep {
        name: def.name.clone(),
        on_failure: def.on_failure,
        check,
        action,
    }
}

/// Populate the cache from the origin. Documents that fetch successfully stay
/// cached even when others fail; any failure fails the step.
fn fetch_documents(step: &str, ctx: StepContext<'_>) -> Result<()> {
    let mut failed = Vec::new();
    for id in ctx.documents {
        if ctx.fetch_mode == FetchMode::MissingOnly && ctx.loader.is_cached(id) {
            continue;
        }
        if let Err(e) = ctx.loader.refresh(id) {
            tracing::warn!(document = %id, "fetch failed: {e}");
            failed.push(id.to_string());
        }
    }
    if failed.is_empty() {
        return Ok(());
    }
    Err(GuidelineError::StepExecutionFailed {
        step: step.to_string(),
        reason: format!(
            "{} of {} documents could not be fetched: {}",
            failed.len(),
            ctx.documents.len(),
            failed.join(", ")
        ),
    })
}

// ---------------------------------------------------------------------------
// BootstrapReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub version: String,
    pub steps: Vec<StepRecord>,
    /// Name of the step whose failure aborted the run.
    pub aborted_at: Option<String>,
    pub marker_written: bool,
}

impl BootstrapReport {
    pub fn is_aborted(&self) -> bool {
        self.aborted_at.is_some()
    }

    pub fn count(&self, outcome: StepState) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }

    pub fn outcome_of(&self, name: &str) -> Option<StepState> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.outcome)
    }

    /// Marker rule: not aborted, and not every step failed.
    fn should_write_marker(&self) -> bool {
        !self.is_aborted() && self.count(StepState::Failed) < self.steps.len().max(1)
    }

    /// Surface an aborted run as `StepExecutionFailed`.
    pub fn into_result(self) -> Result<Self> {
        let Some(step) = self.aborted_at.clone() else {
            return Ok(self);
        };
        let reason = self
            .steps
            .iter()
            .find(|s| s.name == step)
            .and_then(|s| s.detail.clone())
            .unwrap_or_else(|| "aborted".to_string());
        Err(GuidelineError::StepExecutionFailed { step, reason })
    }
}

// ---------------------------------------------------------------------------
// BootstrapOrchestrator
// ---------------------------------------------------------------------------

pub struct BootstrapOrchestrator {
    root: PathBuf,
    version: VersionMarker,
}

impl BootstrapOrchestrator {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version: VersionMarker::new(version),
        }
    }

    pub fn run(&self, steps: Vec<BootstrapStep<'_>>) -> BootstrapReport {
        let mut report = BootstrapReport {
            version: self.version.to_string(),
            steps: Vec::with_capacity(steps.len()),
            aborted_at: None,
            marker_written: false,
        };

        for mut step in steps {
            let started = Instant::now();
            let name = step.name.clone();

            let state = StepState::Pending;
            let satisfied = (step.check)();
            let state = state.advance(&name, StepState::Checked);

            if satisfied {
                let state = state.advance(&name, StepState::Skipped);
                tracing::info!(step = %name, "already satisfied, skipping");
                report.steps.push(record(name, state, None, started));
                continue;
            }

            let state = state.advance(&name, StepState::Executing);
            match (step.action)() {
                Ok(()) => {
                    let state = state.advance(&name, StepState::Succeeded);
                    tracing::info!(step = %name, "step succeeded");
                    report.steps.push(record(name, state, None, started));
                }
                Err(e) => {
                    let state = state.advance(&name, StepState::Failed);
                    let detail = e.to_string();
                    report
                        .steps
                        .push(record(name.clone(), state, Some(detail), started));
                    match step.on_failure {
                        FailurePolicy::Continue => {
                            tracing::warn!(step = %name, "step failed, continuing: {e}");
                        }
                        FailurePolicy::Abort => {
                            tracing::error!(step = %name, "step failed, aborting: {e}");
                            report.aborted_at = Some(name);
                            break;
                        }
                    }
                }
            }
        }

        if report.should_write_marker() {
            match self.version.save(&self.root) {
                Ok(()) => report.marker_written = true,
                Err(e) => tracing::warn!("failed to write version marker: {e}"),
            }
        }

        report
    }
}

fn record(
    name: String,
    outcome: StepState,
    detail: Option<String>,
    started: Instant,
) -> StepRecord {
    StepRecord {
        name,
        outcome,
        detail,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
