use super::Settings;
use crate::output::{print_json, print_table};
use guideline_core::{
    bootstrap::{
        build_steps, BootstrapOrchestrator, BootstrapReport, FetchMode, StepContext, StepState,
    },
    version::VersionMarker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First-time setup: fetch only what is missing.
    Bootstrap,
    /// Refresh every cached document from the origin.
    Sync,
}

/// `guidelines bootstrap` / `guidelines sync`: run the configured steps.
///
/// Exits non-zero only if a step with `on_failure: abort` failed.
pub fn run(settings: &Settings, version: Option<&str>, mode: Mode) -> anyhow::Result<()> {
    let mut config = settings.config()?;
    if let Some(tag) = version {
        config.origin.tag = tag.to_string();
    }
    let resolver = settings.resolver(&config)?;
    let loader = settings.loader(&config)?;
    let documents = resolver.mapping().registry().to_vec();

    let previous = VersionMarker::load(&settings.root)
        .ok()
        .flatten()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "none".to_string());
    let target = config.origin.tag.clone();

    if !settings.json {
        let verb = match mode {
            Mode::Bootstrap => "Bootstrapping",
            Mode::Sync => "Syncing",
        };
        println!("{verb} guidelines in: {}", settings.root.display());
        println!("  previous: {previous}  →  target: {target}\n");
    }

    let ctx = StepContext {
        root: &settings.root,
        loader: &loader,
        documents: &documents,
        fetch_mode: match mode {
            Mode::Bootstrap => FetchMode::MissingOnly,
            Mode::Sync => FetchMode::Refresh,
        },
    };
    let steps = build_steps(&config.bootstrap, ctx);
    let report = BootstrapOrchestrator::new(&settings.root, target).run(steps);

    if settings.json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    report.into_result()?;
    Ok(())
}

fn print_report(report: &BootstrapReport) {
    let rows: Vec<Vec<String>> = report
        .steps
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.outcome.to_string(),
                format!("{}ms", s.duration_ms),
                s.detail.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["STEP", "OUTCOME", "TIME", "DETAIL"], &rows);

    println!();
    if let Some(step) = &report.aborted_at {
        println!("Aborted at '{step}'. Version marker not written.");
    } else if report.marker_written {
        println!("Version marker set to {}.", report.version);
    } else if report.count(StepState::Failed) == report.steps.len() {
        println!("Every step failed. Version marker not written.");
    } else {
        println!("Version marker could not be written.");
    }
}
