use super::Settings;
use crate::output::print_json;
use anyhow::Context;
use guideline_core::{session::SessionContextBuilder, version::VersionMarker};

/// `guidelines load --task-type <T>...`: print the session context.
///
/// Missing documents are warned about and skipped. The command fails only
/// when documents were requested and none of them could be loaded.
pub fn run(settings: &Settings, task_types: &[String]) -> anyhow::Result<()> {
    let tasks = task_types
        .iter()
        .map(|t| super::parse_task_type(t))
        .collect::<Result<Vec<_>, _>>()?;

    if let Ok(Some(marker)) = VersionMarker::load(&settings.root) {
        tracing::debug!(version = %marker, "guidelines version");
    }

    let config = settings.config()?;
    let resolver = settings.resolver(&config)?;
    let loader = settings.loader(&config)?;

    let context = SessionContextBuilder::new(&resolver, &loader)
        .build_many(&tasks)
        .context("failed to build guideline context")?;

    if context.requested() > 0 && context.is_empty() {
        anyhow::bail!(
            "none of the {} requested guideline documents could be loaded",
            context.requested()
        );
    }

    if settings.json {
        print_json(&context)?;
    } else {
        print!("{}", context.render());
    }
    Ok(())
}
