use crate::error::Result;
use crate::paths;
use std::fmt;
use std::path::Path;

/// The tag recorded by the last bootstrap/sync pass. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker(String);

impl VersionMarker {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read `.guidelines/VERSION`. Missing or blank files yield `None`.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = paths::version_path(root);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let value = raw.trim();
        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self(value.to_string())))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::version_path(root);
        crate::io::atomic_write(&path, format!("{}\n", self.0).as_bytes())
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_marker_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(VersionMarker::load(dir.path()).unwrap(), None);
    }

    #[test]
    fn save_overwrites_previous_value() {
        let dir = TempDir::new().unwrap();
        VersionMarker::new("v1.0.0").save(dir.path()).unwrap();
        VersionMarker::new("main").save(dir.path()).unwrap();
        let loaded = VersionMarker::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.as_str(), "main");
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".guidelines/VERSION")).unwrap(),
            "main\n"
        );
    }

    #[test]
    fn blank_marker_is_none() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".guidelines")).unwrap();
        std::fs::write(dir.path().join(".guidelines/VERSION"), "  \n").unwrap();
        assert_eq!(VersionMarker::load(dir.path()).unwrap(), None);
    }
}
