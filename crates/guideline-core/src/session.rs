use crate::error::Result;
use crate::loader::DocumentLoader;
use crate::resolver::ConfigResolver;
use crate::types::{DocumentId, SourceKind, TaskType};
use serde::Serialize;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    pub id: DocumentId,
    /// Task type whose resolution first pulled this document in.
    pub task_type: TaskType,
    pub source: SourceKind,
    pub location: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedDocument {
    pub id: DocumentId,
    pub task_type: TaskType,
    pub reason: String,
}

/// Ordered, de-duplicated guideline text for one agent session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    task_types: Vec<TaskType>,
    entries: Vec<ContextEntry>,
    skipped: Vec<SkippedDocument>,
    #[serde(skip)]
    seen: HashSet<DocumentId>,
}

impl SessionContext {
    pub fn task_types(&self) -> &[TaskType] {
        &self.task_types
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn skipped(&self) -> &[SkippedDocument] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct documents the build attempted, loaded or not.
    pub fn requested(&self) -> usize {
        self.seen.len()
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    pub fn ids(&self) -> Vec<&DocumentId> {
        self.entries.iter().map(|e| &e.id).collect()
    }

    /// Concatenate every entry into the text blob handed to the agent.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!(
                "<!-- guideline: {} (task: {}, source: {}) -->\n",
                entry.id, entry.task_type, entry.source
            ));
            out.push_str(entry.content.trim_end());
            out.push('\n');
        }
        out
    }
}

// ---------------------------------------------------------------------------
// SessionContextBuilder
// ---------------------------------------------------------------------------

pub struct SessionContextBuilder<'a> {
    resolver: &'a ConfigResolver,
    loader: &'a DocumentLoader,
}

impl<'a> SessionContextBuilder<'a> {
    pub fn new(resolver: &'a ConfigResolver, loader: &'a DocumentLoader) -> Self {
        Self { resolver, loader }
    }

    pub fn build(&self, task: &TaskType) -> Result<SessionContext> {
        self.build_many(std::slice::from_ref(task))
    }

    /// Build one context for several task types. Every task type is resolved
    /// before anything is loaded, so an unknown key fails without I/O.
    pub fn build_many(&self, tasks: &[TaskType]) -> Result<SessionContext> {
        let plan = tasks
            .iter()
            .map(|t| self.resolver.resolve(t).map(|ids| (t, ids)))
            .collect::<Result<Vec<_>>>()?;

        let mut ctx = SessionContext::default();
        for (task, ids) in plan {
            if !ctx.task_types.contains(task) {
                ctx.task_types.push(task.clone());
            }
            self.extend(&mut ctx, task, &ids)?;
        }
        Ok(ctx)
    }

    /// Load `ids` into `ctx` in order. Ids already attempted are ignored;
    /// unavailable documents are skipped with one warning each.
    pub fn extend(
        &self,
        ctx: &mut SessionContext,
        task: &TaskType,
        ids: &[DocumentId],
    ) -> Result<()> {
        for id in ids {
            if !ctx.seen.insert(id.clone()) {
                continue;
            }
            match self.loader.load(id) {
                Ok(doc) => ctx.entries.push(ContextEntry {
                    id: doc.id,
                    task_type: task.clone(),
                    source: doc.source,
                    location: doc.location,
                    content: doc.content,
                }),
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(document = %id, task = %task, "skipping guideline: {e}");
                    ctx.skipped.push(SkippedDocument {
                        id: id.clone(),
                        task_type: task.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
