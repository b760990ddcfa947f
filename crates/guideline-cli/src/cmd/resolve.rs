use super::Settings;
use crate::output::print_json;

pub fn run(settings: &Settings, task_type: &str) -> anyhow::Result<()> {
    let task = super::parse_task_type(task_type)?;
    let config = settings.config()?;
    let resolver = settings.resolver(&config)?;
    let ids = resolver.resolve(&task)?;

    if settings.json {
        print_json(&serde_json::json!({
            "task_type": task,
            "documents": ids,
        }))?;
    } else {
        for id in &ids {
            println!("{id}");
        }
    }
    Ok(())
}
