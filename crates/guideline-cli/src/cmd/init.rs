use super::Settings;
use anyhow::Context;
use guideline_core::{config::Config, io, paths};

/// `guidelines init`: create `.guidelines/` and write the default config.
///
/// Idempotent: an existing config.yaml is left untouched.
pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let root = &settings.root;
    println!("Initializing guidelines in: {}", root.display());

    for dir in [paths::GUIDELINES_DIR, paths::LOCAL_DIR, paths::CACHE_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    if Config::exists(root) {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    let entry = format!("{}/", paths::CACHE_DIR);
    if io::ensure_gitignore_entry(root, &entry).context("failed to update .gitignore")? {
        println!("  updated: .gitignore ({entry})");
    }

    let config = settings.config()?;
    if config.uses_placeholder_origin() {
        println!(
            "\nNote: origin.base_url is the placeholder {}.\n\
             Set it in {} (or pass --origin) before fetching remote documents.",
            config.origin.base_url,
            paths::CONFIG_FILE
        );
    }

    println!("\nGuidelines initialized.");
    println!("Next: guidelines bootstrap");
    Ok(())
}
