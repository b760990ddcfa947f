use super::Settings;
use crate::output::{print_json, print_table};
use guideline_core::{types::SourceKind, version::VersionMarker};
use serde::Serialize;

#[derive(Serialize)]
struct DocumentStatus {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    tasks: Vec<String>,
    source: Option<SourceKind>,
    location: Option<String>,
}

/// `guidelines status`: version marker plus the precedence level that would
/// serve each registered document. Never touches the network.
pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let config = settings.config()?;
    let resolver = settings.resolver(&config)?;
    let loader = settings.loader(&config)?;
    let version = VersionMarker::load(&settings.root)?;

    let documents: Vec<DocumentStatus> = resolver
        .mapping()
        .registry()
        .iter()
        .map(|id| {
            let tasks = config
                .tasks
                .iter()
                .filter(|(_, ids)| ids.contains(id))
                .map(|(t, _)| t.to_string())
                .collect();
            let source = loader.locate(id);
            let location = source.and_then(|kind| {
                loader
                    .candidates(id)
                    .into_iter()
                    .find(|c| c.kind == kind)
                    .map(|c| c.location)
            });
            DocumentStatus {
                id: id.to_string(),
                title: config.document(id).and_then(|d| d.title.clone()),
                tasks,
                source,
                location,
            }
        })
        .collect();

    if settings.json {
        print_json(&serde_json::json!({
            "version": version.as_ref().map(|v| v.as_str()),
            "documents": documents,
        }))?;
        return Ok(());
    }

    match &version {
        Some(v) => println!("Version: {v}"),
        None => println!("Version: none (run 'guidelines bootstrap')"),
    }
    println!();

    let rows: Vec<Vec<String>> = documents
        .iter()
        .map(|d| {
            vec![
                d.id.clone(),
                d.title.clone().unwrap_or_default(),
                d.tasks.join(","),
                d.source
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unavailable".to_string()),
                d.location.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["DOCUMENT", "TITLE", "TASKS", "SOURCE", "LOCATION"], &rows);
    Ok(())
}
