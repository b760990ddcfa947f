use crate::error::{GuidelineError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GUIDELINES_DIR: &str = ".guidelines";
pub const LOCAL_DIR: &str = ".guidelines/local";
pub const CACHE_DIR: &str = ".guidelines/cache";

pub const CONFIG_FILE: &str = ".guidelines/config.yaml";
pub const VERSION_FILE: &str = ".guidelines/VERSION";

pub const DOCUMENT_EXT: &str = "md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn version_path(root: &Path) -> PathBuf {
    root.join(VERSION_FILE)
}

pub fn local_dir(root: &Path) -> PathBuf {
    root.join(LOCAL_DIR)
}

/// File name a document is stored under in both the local and cache dirs.
pub fn document_file_name(id: &str) -> String {
    format!("{id}.{DOCUMENT_EXT}")
}

/// Resolve a configured directory. `~/` expands to the user's home, relative
/// paths are taken relative to the project root.
pub fn resolve_dir(root: &Path, configured: &str) -> Result<PathBuf> {
    if let Some(rest) = configured.strip_prefix("~/") {
        let home = home::home_dir().ok_or(GuidelineError::HomeNotFound)?;
        return Ok(home.join(rest));
    }
    let p = Path::new(configured);
    if p.is_absolute() {
        Ok(p.to_path_buf())
    } else {
        Ok(root.join(p))
    }
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

static IDENT_RE: OnceLock<Regex> = OnceLock::new();

fn ident_re() -> &'static Regex {
    IDENT_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

/// Shared rule for document ids and task-type keys.
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.len() <= 64 && ident_re().is_match(s)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
