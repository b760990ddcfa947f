use super::Settings;
use crate::output::print_json;
use clap::Subcommand;
use guideline_core::config::WarnLevel;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the guideline mapping and bootstrap steps
    Validate,

    /// Print the effective configuration (defaults plus overrides) as YAML
    Show,
}

pub fn run(settings: &Settings, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate => validate(settings),
        ConfigSubcommand::Show => show(settings),
    }
}

fn validate(settings: &Settings) -> anyhow::Result<()> {
    let config = settings.config()?;
    let warnings = config.validate();

    if settings.json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn show(settings: &Settings) -> anyhow::Result<()> {
    let config = settings.config()?;
    if settings.json {
        print_json(&config)?;
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
    }
    Ok(())
}
