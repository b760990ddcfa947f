//! Task type → document id resolution.
//!
//! The mapping is plain data taken from [`Config`]; all validation happens
//! once in [`GuidelineMapping::from_config`], so `resolve` never has to deal
//! with dangling references.

use crate::config::Config;
use crate::error::{GuidelineError, Result};
use crate::types::{DocumentId, TaskType};
use std::collections::{BTreeMap, HashSet};

// ---------------------------------------------------------------------------
// GuidelineMapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GuidelineMapping {
    /// Canonical document order.
    registry: Vec<DocumentId>,
    tasks: BTreeMap<TaskType, Vec<DocumentId>>,
}

impl GuidelineMapping {
    pub fn from_config(config: &Config) -> Result<Self> {
        let errors = config.errors();
        if !errors.is_empty() {
            return Err(GuidelineError::InvalidMapping(errors.join("; ")));
        }
        Ok(Self {
            registry: config.documents.iter().map(|d| d.id.clone()).collect(),
            tasks: config.tasks.clone(),
        })
    }

    pub fn registry(&self) -> &[DocumentId] {
        &self.registry
    }

    pub fn task_types(&self) -> impl Iterator<Item = &TaskType> {
        self.tasks.keys()
    }
}

// ---------------------------------------------------------------------------
// ConfigResolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConfigResolver {
    mapping: GuidelineMapping,
}

impl ConfigResolver {
    pub fn new(mapping: GuidelineMapping) -> Self {
        Self { mapping }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(GuidelineMapping::from_config(config)?))
    }

    pub fn mapping(&self) -> &GuidelineMapping {
        &self.mapping
    }

    pub fn is_known(&self, task: &TaskType) -> bool {
        task.is_all() || self.mapping.tasks.contains_key(task)
    }

    /// Ordered, duplicate-free document ids for `task`.
    ///
    /// `all` yields every document referenced by some task type, in registry
    /// order rather than in map iteration order.
    pub fn resolve(&self, task: &TaskType) -> Result<Vec<DocumentId>> {
        if task.is_all() {
            let referenced: HashSet<&DocumentId> = self.mapping.tasks.values().flatten().collect();
            return Ok(self
                .mapping
                .registry
                .iter()
                .filter(|id| referenced.contains(id))
                .cloned()
                .collect());
        }
        self.mapping
            .tasks
            .get(task)
            .cloned()
            .ok_or_else(|| GuidelineError::UnknownTaskType(task.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
