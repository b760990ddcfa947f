//! Guideline document loading.
//!
//! A document is looked up through a fixed precedence chain:
//!
//! 1. project-local override: `.guidelines/local/<id>.md`
//! 2. cache: `<cache_dir>/<id>.md`
//! 3. remote origin: `{base_url}/{tag}/<id>.md` (or the entry's `url`)
//!
//! The first candidate that exists and is readable wins. A remote hit is
//! written back to the cache so the next load stays off the network.

use crate::config::{Config, OriginConfig};
use crate::error::{GuidelineError, Result};
use crate::paths;
use crate::types::{DocumentId, SourceKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// GuidelineDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GuidelineDocument {
    pub id: DocumentId,
    pub source: SourceKind,
    /// Path or URL the content was read from.
    pub location: String,
    pub content: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCandidate {
    pub kind: SourceKind,
    pub location: String,
}

// ---------------------------------------------------------------------------
// DocumentCache
// ---------------------------------------------------------------------------

/// Directory-backed document cache. Passed to the loader explicitly so
/// callers control where (and whether) cached copies live.
#[derive(Debug, Clone)]
pub struct DocumentCache {
    dir: PathBuf,
}

impl DocumentCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, id: &DocumentId) -> PathBuf {
        self.dir.join(paths::document_file_name(id.as_str()))
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.path(id).is_file()
    }

    pub fn get(&self, id: &DocumentId) -> Result<Option<String>> {
        read_optional(&self.path(id))
    }

    pub fn put(&self, id: &DocumentId, content: &str) -> Result<()> {
        crate::io::atomic_write(&self.path(id), content.as_bytes())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// RemoteFetcher
// ---------------------------------------------------------------------------

/// Fetches a document body from the remote origin.
///
/// Implementations must be bounded in time and return either the complete
/// body or an error (`NetworkTimeout` / `DocumentUnavailable`).
pub trait RemoteFetcher {
    fn fetch(&self, id: &DocumentId, url: &str) -> Result<String>;
}

/// Blocking HTTP fetcher with a fixed per-request timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("guidelines/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, id: &DocumentId, url: &str, err: reqwest::Error) -> GuidelineError {
        if err.is_timeout() {
            GuidelineError::NetworkTimeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            GuidelineError::DocumentUnavailable {
                id: id.to_string(),
                reason: format!("{url}: {err}"),
            }
        }
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, id: &DocumentId, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| self.classify(id, url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GuidelineError::DocumentUnavailable {
                id: id.to_string(),
                reason: format!("{url} returned {status}"),
            });
        }
        // The body read is covered by the same timeout; a truncated body is an
        // error, never a partial document.
        response.text().map_err(|e| self.classify(id, url, e))
    }
}

// ---------------------------------------------------------------------------
// DocumentLoader
// ---------------------------------------------------------------------------

pub struct DocumentLoader {
    local_dir: PathBuf,
    cache: DocumentCache,
    origin: OriginConfig,
    urls: HashMap<DocumentId, String>,
    fetcher: Option<Box<dyn RemoteFetcher>>,
}

impl DocumentLoader {
    /// A loader with no remote fetcher (offline). Use [`with_fetcher`] to
    /// enable the remote candidate.
    ///
    /// [`with_fetcher`]: DocumentLoader::with_fetcher
    pub fn new(local_dir: impl Into<PathBuf>, cache: DocumentCache, origin: OriginConfig) -> Self {
        Self {
            local_dir: local_dir.into(),
            cache,
            origin,
            urls: HashMap::new(),
            fetcher: None,
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl RemoteFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    pub fn with_url(mut self, id: DocumentId, url: impl Into<String>) -> Self {
        self.urls.insert(id, url.into());
        self
    }

    /// Build a loader for a project: local overrides under the root, the
    /// configured cache dir, and an HTTP fetcher unless `offline`.
    pub fn from_config(root: &Path, config: &Config, offline: bool) -> Result<Self> {
        let cache = DocumentCache::new(config.cache_dir(root)?);
        let mut loader = Self::new(paths::local_dir(root), cache, config.origin.clone());
        for doc in &config.documents {
            if let Some(url) = &doc.url {
                loader = loader.with_url(doc.id.clone(), url.clone());
            }
        }
        if !offline {
            let timeout = Duration::from_secs(config.origin.timeout_seconds);
            loader = loader.with_fetcher(HttpFetcher::new(timeout)?);
        }
        Ok(loader)
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub fn is_online(&self) -> bool {
        self.fetcher.is_some()
    }

    pub fn is_cached(&self, id: &DocumentId) -> bool {
        self.cache.contains(id)
    }

    pub fn local_path(&self, id: &DocumentId) -> PathBuf {
        self.local_dir.join(paths::document_file_name(id.as_str()))
    }

    pub fn remote_url(&self, id: &DocumentId) -> String {
        self.urls
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.origin.document_url(id))
    }

    /// The precedence chain for `id`, highest precedence first.
    pub fn candidates(&self, id: &DocumentId) -> Vec<SourceCandidate> {
        vec![
            SourceCandidate {
                kind: SourceKind::Local,
                location: self.local_path(id).display().to_string(),
            },
            SourceCandidate {
                kind: SourceKind::Cache,
                location: self.cache.path(id).display().to_string(),
            },
            SourceCandidate {
                kind: SourceKind::Remote,
                location: self.remote_url(id),
            },
        ]
    }

    /// Which precedence level would serve `id`, without touching the network.
    /// Remote is reported only when a fetcher is installed.
    pub fn locate(&self, id: &DocumentId) -> Option<SourceKind> {
        if self.local_path(id).is_file() {
            Some(SourceKind::Local)
        } else if self.cache.contains(id) {
            Some(SourceKind::Cache)
        } else if self.is_online() {
            Some(SourceKind::Remote)
        } else {
            None
        }
    }

    /// Load `id` through the precedence chain. Returns the full text or an
    /// error; never a partial document.
    pub fn load(&self, id: &DocumentId) -> Result<GuidelineDocument> {
        let mut unreadable = Vec::new();

        let local = self.local_path(id);
        if let Some(content) = readable(&local, SourceKind::Local, &mut unreadable) {
            tracing::debug!(document = %id, path = %local.display(), "loaded local override");
            return Ok(document(id, SourceKind::Local, local.display().to_string(), content));
        }

        let cached = self.cache.path(id);
        if let Some(content) = readable(&cached, SourceKind::Cache, &mut unreadable) {
            tracing::debug!(document = %id, path = %cached.display(), "loaded from cache");
            return Ok(document(id, SourceKind::Cache, cached.display().to_string(), content));
        }

        let url = self.remote_url(id);
        let content = self
            .fetch(id, &url)
            .map_err(|e| with_unreadable(e, &unreadable))?;
        if let Err(e) = self.cache.put(id, &content) {
            tracing::warn!(document = %id, error = %e, "failed to write document to cache");
        }
        tracing::info!(document = %id, url = %url, "fetched from origin");
        Ok(document(id, SourceKind::Remote, url, content))
    }

    /// Fetch `id` from the origin and replace the cached copy, ignoring any
    /// local override or existing cache entry.
    pub fn refresh(&self, id: &DocumentId) -> Result<GuidelineDocument> {
        let url = self.remote_url(id);
        let content = self.fetch(id, &url)?;
        self.cache.put(id, &content)?;
        tracing::info!(document = %id, url = %url, "refreshed cached copy");
        Ok(document(id, SourceKind::Remote, url, content))
    }

    fn fetch(&self, id: &DocumentId, url: &str) -> Result<String> {
        let Some(fetcher) = &self.fetcher else {
            return Err(GuidelineError::DocumentUnavailable {
                id: id.to_string(),
                reason: "no usable local or cached copy, and remote fetch is disabled".to_string(),
            });
        };
        fetcher.fetch(id, url)
    }
}

/// Read a candidate file. Missing and unreadable files both count as absent;
/// unreadable ones are noted so a final failure can report them.
fn readable(path: &Path, kind: SourceKind, unreadable: &mut Vec<String>) -> Option<String> {
    match read_optional(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(
                source = %kind,
                path = %path.display(),
                error = %e,
                "unreadable candidate"
            );
            unreadable.push(format!("{kind} copy {} is unreadable: {e}", path.display()));
            None
        }
    }
}

fn with_unreadable(err: GuidelineError, unreadable: &[String]) -> GuidelineError {
    match err {
        GuidelineError::DocumentUnavailable { id, reason } if !unreadable.is_empty() => {
            GuidelineError::DocumentUnavailable {
                id,
                reason: format!("{}; {reason}", unreadable.join("; ")),
            }
        }
        other => other,
    }
}

fn document(
    id: &DocumentId,
    source: SourceKind,
    location: String,
    content: String,
) -> GuidelineDocument {
    GuidelineDocument {
        id: id.clone(),
        source,
        location,
        content,
        loaded_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    /// Serves a fixed body and counts calls.
    struct StubFetcher {
        body: Option<String>,
        calls: Rc<Cell<usize>>,
    }

    impl RemoteFetcher for StubFetcher {
        fn fetch(&self, id: &DocumentId, url: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.body
                .clone()
                .ok_or_else(|| GuidelineError::DocumentUnavailable {
                    id: id.to_string(),
                    reason: format!("{url} returned 404 Not Found"),
                })
        }
    }

    struct Fixture {
        _dir: TempDir,
        local: PathBuf,
        cache: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("local");
        let cache = dir.path().join("cache");
        Fixture {
            local,
            cache,
            _dir: dir,
        }
    }

    fn loader(fx: &Fixture) -> DocumentLoader {
        DocumentLoader::new(
            &fx.local,
            DocumentCache::new(&fx.cache),
            OriginConfig::default(),
        )
    }

    fn stub(body: Option<&str>) -> (StubFetcher, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            StubFetcher {
                body: body.map(str::to_string),
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(format!("{name}.md")), content).unwrap();
    }

    #[test]
    fn local_override_wins_over_cache_and_remote() {
        let fx = fixture();
        write(&fx.local, "git-workflow", "local text");
        write(&fx.cache, "git-workflow", "cached text");
        let (fetcher, calls) = stub(Some("remote text"));
        let loader = loader(&fx).with_fetcher(fetcher);

        let doc = loader.load(&id("git-workflow")).unwrap();
        assert_eq!(doc.source, SourceKind::Local);
        assert_eq!(doc.content, "local text");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn cache_wins_over_remote() {
        let fx = fixture();
        write(&fx.cache, "git-workflow", "cached text");
        let (fetcher, calls) = stub(Some("remote text"));
        let loader = loader(&fx).with_fetcher(fetcher);

        let doc = loader.load(&id("git-workflow")).unwrap();
        assert_eq!(doc.source, SourceKind::Cache);
        assert_eq!(doc.content, "cached text");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn remote_hit_is_cached_for_next_load() {
        let fx = fixture();
        let (fetcher, calls) = stub(Some("# Review\n"));
        let loader = loader(&fx).with_fetcher(fetcher);
        let doc_id = id("code-review");

        let first = loader.load(&doc_id).unwrap();
        assert_eq!(first.source, SourceKind::Remote);
        assert!(loader.is_cached(&doc_id));

        let second = loader.load(&doc_id).unwrap();
        assert_eq!(second.source, SourceKind::Cache);
        assert_eq!(second.content, "# Review\n");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn cache_write_failure_does_not_fail_load() {
        let fx = fixture();
        // A regular file where the cache directory should be.
        std::fs::create_dir_all(fx.cache.parent().unwrap()).unwrap();
        std::fs::write(&fx.cache, "not a directory").unwrap();
        let (fetcher, _) = stub(Some("body"));
        let loader = loader(&fx).with_fetcher(fetcher);

        let doc = loader.load(&id("testing")).unwrap();
        assert_eq!(doc.content, "body");
        assert_eq!(doc.source, SourceKind::Remote);
    }

    #[test]
    fn missing_everywhere_is_unavailable() {
        let fx = fixture();
        let (fetcher, _) = stub(None);
        let loader = loader(&fx).with_fetcher(fetcher);
        let err = loader.load(&id("nope")).unwrap_err();
        assert!(err.is_unavailable());
        assert!(!loader.is_cached(&id("nope")));
    }

    #[test]
    fn offline_loader_skips_remote() {
        let fx = fixture();
        let loader = loader(&fx);
        assert!(!loader.is_online());
        let err = loader.load(&id("git-workflow")).unwrap_err();
        assert!(matches!(err, GuidelineError::DocumentUnavailable { .. }));
        assert_eq!(loader.locate(&id("git-workflow")), None);
    }

    #[test]
    fn unreadable_candidate_is_reported_in_reason() {
        let fx = fixture();
        std::fs::create_dir_all(fx.local.join("git-workflow.md")).unwrap();
        let loader = loader(&fx);

        let err = loader.load(&id("git-workflow")).unwrap_err();
        match err {
            GuidelineError::DocumentUnavailable { reason, .. } => {
                assert!(reason.contains("local copy"), "{reason}");
                assert!(reason.contains("unreadable"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreadable_local_falls_through_to_cache() {
        let fx = fixture();
        std::fs::create_dir_all(fx.local.join("git-workflow.md")).unwrap();
        write(&fx.cache, "git-workflow", "cached text");
        let doc = loader(&fx).load(&id("git-workflow")).unwrap();
        assert_eq!(doc.source, SourceKind::Cache);
    }

    #[test]
    fn refresh_replaces_stale_cache_even_with_local_override() {
        let fx = fixture();
        write(&fx.local, "git-workflow", "local text");
        write(&fx.cache, "git-workflow", "stale");
        let (fetcher, calls) = stub(Some("fresh"));
        let loader = loader(&fx).with_fetcher(fetcher);

        let doc = loader.refresh(&id("git-workflow")).unwrap();
        assert_eq!(doc.content, "fresh");
        assert_eq!(calls.get(), 1);
        assert_eq!(
            loader.cache().get(&id("git-workflow")).unwrap().as_deref(),
            Some("fresh")
        );
        // Local override still takes precedence on load.
        assert_eq!(loader.load(&id("git-workflow")).unwrap().content, "local text");
    }

    #[test]
    fn candidates_are_in_precedence_order() {
        let fx = fixture();
        let loader = loader(&fx).with_url(id("style"), "https://example.com/style.md");
        let c = loader.candidates(&id("style"));
        let kinds: Vec<SourceKind> = c.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, SourceKind::all());
        assert!(c[0].location.ends_with("local/style.md"));
        assert!(c[1].location.ends_with("cache/style.md"));
        assert_eq!(c[2].location, "https://example.com/style.md");
    }

    #[test]
    fn locate_reports_highest_available_level() {
        let fx = fixture();
        write(&fx.cache, "a", "x");
        let (fetcher, _) = stub(Some("y"));
        let loader = loader(&fx).with_fetcher(fetcher);
        assert_eq!(loader.locate(&id("a")), Some(SourceKind::Cache));
        assert_eq!(loader.locate(&id("b")), Some(SourceKind::Remote));
        write(&fx.local, "a", "z");
        assert_eq!(loader.locate(&id("a")), Some(SourceKind::Local));
    }

    // -----------------------------------------------------------------------
    // HTTP fetcher against a local mock server
    // -----------------------------------------------------------------------

    #[test]
    fn http_fetcher_returns_body_on_200() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/main/git-workflow.md")
            .with_status(200)
            .with_body("# Git workflow\n")
            .create();

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/main/git-workflow.md", server.url());
        let body = fetcher.fetch(&id("git-workflow"), &url).unwrap();
        assert_eq!(body, "# Git workflow\n");
        mock.assert();
    }

    #[test]
    fn http_fetcher_maps_404_to_unavailable() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/main/missing.md").with_status(404).create();

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/main/missing.md", server.url());
        let err = fetcher.fetch(&id("missing"), &url).unwrap_err();
        match err {
            GuidelineError::DocumentUnavailable { id, reason } => {
                assert_eq!(id, "missing");
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn http_fetcher_times_out_on_silent_server() {
        // Accepted by the kernel backlog, never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/x.md", listener.local_addr().unwrap());

        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        let started = std::time::Instant::now();
        let err = fetcher.fetch(&id("x"), &url).unwrap_err();

        match err {
            GuidelineError::NetworkTimeout { url: u, seconds } => {
                assert_eq!(u, url);
                assert_eq!(seconds, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn loader_fetches_from_origin_and_caches() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v1/code-review.md")
            .with_status(200)
            .with_body("review body")
            .expect(1)
            .create();

        let fx = fixture();
        let origin = OriginConfig {
            base_url: server.url(),
            tag: "v1".to_string(),
            timeout_seconds: 5,
        };
        let loader = DocumentLoader::new(&fx.local, DocumentCache::new(&fx.cache), origin)
            .with_fetcher(HttpFetcher::new(Duration::from_secs(5)).unwrap());

        assert_eq!(loader.load(&id("code-review")).unwrap().source, SourceKind::Remote);
        assert_eq!(loader.load(&id("code-review")).unwrap().source, SourceKind::Cache);
        mock.assert();
    }
}
