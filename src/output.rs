//! Output Writer
//!
//! Persists a job's artifacts under its slug:
//!
//! - `{slug}.html`: the reconstructed page
//! - `{slug}.json`: the `Metadata` record
//! - `{slug}.png`: full-page screenshot, best effort
//! - `{slug}-search-index.json`: the static index
//! - `pe-search.js`: the shared query script
//!
//! Everything is written into a uniquely named staging directory next to the
//! output and promoted by rename once all writes succeed. If a rename fails
//! midway, the files already promoted are rolled back and any previous
//! artifacts they replaced are restored. The staging directory is removed
//! when it drops, which also covers jobs cancelled by the job timeout.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::patterns::SAFE_SLUG;
use crate::result::{JobState, Metadata};
use crate::search::{index_file_name, SearchIndex, SEARCH_SCRIPT, SEARCH_SCRIPT_NAME};

/// Everything a finished job hands to the writer.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub html: String,
    pub metadata: Metadata,
    pub screenshot: Option<Vec<u8>>,
    pub index: SearchIndex,
}

/// Final locations of the written artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub html: PathBuf,
    pub metadata: PathBuf,
    pub screenshot: Option<PathBuf>,
    pub index: PathBuf,
    pub script: PathBuf,
}

impl ArtifactPaths {
    /// Every written file, in promotion order.
    #[must_use]
    pub fn files(&self) -> Vec<&Path> {
        let mut files = vec![self.html.as_path(), self.metadata.as_path()];
        if let Some(png) = &self.screenshot {
            files.push(png);
        }
        files.push(&self.index);
        files.push(&self.script);
        files
    }
}

/// Reject slugs that are not a plain file basename.
pub fn validate_slug(slug: &str) -> Result<()> {
    if SAFE_SLUG.is_match(slug) && !slug.contains("..") {
        Ok(())
    } else {
        Err(Error::InvalidSlug(slug.to_string()))
    }
}

/// Staging directory that removes itself on drop.
struct Staging {
    dir: TempDir,
}

/// A promoted file and the earlier artifact it replaced, if any.
struct Promoted {
    to: PathBuf,
    previous: Option<PathBuf>,
}

impl Staging {
    fn create(out_dir: &Path, slug: &str) -> Result<Self> {
        fs::create_dir_all(out_dir).map_err(|source| write_failure(out_dir, source))?;
        let dir = tempfile::Builder::new()
            .prefix(&format!(".{slug}.staging-"))
            .tempdir_in(out_dir)
            .map_err(|source| write_failure(out_dir, source))?;
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, bytes).map_err(|source| write_failure(&path, source))?;
        Ok(path)
    }

    /// Move every staged file into `out_dir`. All or nothing: a failed rename
    /// undoes the renames before it.
    fn promote(self, out_dir: &Path, names: &[String]) -> Result<()> {
        let mut done: Vec<Promoted> = Vec::with_capacity(names.len());
        for name in names {
            match self.promote_one(out_dir, name) {
                Ok(promoted) => done.push(promoted),
                Err(e) => {
                    self.roll_back(&done);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn promote_one(&self, out_dir: &Path, name: &str) -> Result<Promoted> {
        let from = self.path().join(name);
        let to = out_dir.join(name);
        let previous = if to.is_file() {
            let backup = self.path().join(format!("{name}.previous"));
            fs::rename(&to, &backup).map_err(|source| write_failure(&to, source))?;
            Some(backup)
        } else {
            None
        };
        if let Err(source) = fs::rename(&from, &to) {
            if let Some(backup) = &previous {
                restore(backup, &to);
            }
            return Err(write_failure(&to, source));
        }
        Ok(Promoted { to, previous })
    }

    fn roll_back(&self, done: &[Promoted]) {
        for promoted in done.iter().rev() {
            match &promoted.previous {
                Some(backup) => restore(backup, &promoted.to),
                None => {
                    if let Err(e) = fs::remove_file(&promoted.to) {
                        if e.kind() != ErrorKind::NotFound {
                            warn!(error = %e, path = %promoted.to.display(), "promoted file not rolled back");
                        }
                    }
                }
            }
        }
        debug!(dir = %self.path().display(), files = done.len(), "promotion rolled back");
    }
}

fn restore(backup: &Path, to: &Path) {
    if let Err(e) = fs::rename(backup, to) {
        warn!(error = %e, path = %to.display(), "previous artifact not restored");
    }
}

fn write_failure(path: &Path, source: std::io::Error) -> Error {
    Error::WriteFailure {
        path: path.to_path_buf(),
        source,
    }
}

/// Write all artifacts for `slug` into `out_dir`.
///
/// A screenshot that cannot be written becomes a warning and a null
/// `screenshotPath`; every other write failure is fatal and leaves nothing
/// behind. The metadata record is finalized (paths, `done` state) before it
/// is serialized.
pub fn write_artifacts(out_dir: &Path, slug: &str, mut artifacts: Artifacts) -> Result<ArtifactPaths> {
    validate_slug(slug)?;
    let staging = Staging::create(out_dir, slug)?;
    let mut names: Vec<String> = Vec::new();

    let html_name = format!("{slug}.html");
    staging.write(&html_name, artifacts.html.as_bytes())?;
    names.push(html_name.clone());

    let png_name = format!("{slug}.png");
    artifacts.metadata.screenshot_path = None;
    if let Some(png) = artifacts.screenshot.as_deref().filter(|b| !b.is_empty()) {
        match staging.write(&png_name, png) {
            Ok(_) => {
                artifacts.metadata.screenshot_path = Some(png_name.clone());
                names.push(png_name.clone());
            }
            Err(e) => {
                warn!(error = %e, "screenshot not written");
                artifacts.metadata.warnings.push(format!("screenshot: {e}"));
            }
        }
    }

    let index_name = index_file_name(slug);
    let index_json = artifacts
        .index
        .to_json()
        .map_err(|e| write_failure(&out_dir.join(&index_name), std::io::Error::other(e)))?;
    staging.write(&index_name, index_json.as_bytes())?;
    names.push(index_name.clone());
    artifacts.metadata.search_index_path = Some(index_name.clone());

    staging.write(SEARCH_SCRIPT_NAME, SEARCH_SCRIPT.as_bytes())?;
    names.push(SEARCH_SCRIPT_NAME.to_string());

    let json_name = format!("{slug}.json");
    artifacts.metadata.state = JobState::Done;
    let json = serde_json::to_vec_pretty(&artifacts.metadata)
        .map_err(|e| write_failure(&out_dir.join(&json_name), std::io::Error::other(e)))?;
    staging.write(&json_name, &json)?;
    names.push(json_name.clone());

    staging.promote(out_dir, &names)?;

    let paths = ArtifactPaths {
        html: out_dir.join(html_name),
        metadata: out_dir.join(json_name),
        screenshot: artifacts.metadata.screenshot_path.as_ref().map(|_| out_dir.join(png_name)),
        index: out_dir.join(index_name),
        script: out_dir.join(SEARCH_SCRIPT_NAME),
    };
    info!(slug, dir = %out_dir.display(), "artifacts written");
    Ok(paths)
}

/// Opaque upload capability used by adjacent pipelines.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `buffer` under `key` and return its public URL.
    async fn store(&self, buffer: Vec<u8>, key: &str, content_type: &str) -> Result<String>;
}

/// Object store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    /// Store under `root`; returned URLs are `public_base` + `/` + key.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn store(&self, buffer: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        let key = key.trim_start_matches('/');
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(Error::InvalidObjectKey(key.to_string()));
        }
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| write_failure(parent, source))?;
        }
        tokio::fs::write(&path, buffer)
            .await
            .map_err(|source| write_failure(&path, source))?;
        debug!(key, content_type, "object stored");
        Ok(format!("{}/{key}", self.public_base))
    }
}

/// MIME type for an artifact file name.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("js") => "application/javascript",
        _ => "application/octet-stream",
    }
}

/// Upload written artifacts under `prefix`, returning the URLs in file order.
pub async fn publish_artifacts<S: ObjectStore + ?Sized>(
    store: &S,
    paths: &ArtifactPaths,
    prefix: &str,
) -> Result<Vec<String>> {
    let prefix = prefix.trim_matches('/');
    let mut urls = Vec::new();
    for file in paths.files() {
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let key = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        let buffer = tokio::fs::read(file).await.map_err(|source| write_failure(file, source))?;
        urls.push(store.store(buffer, &key, content_type_for(file)).await?);
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::IndexDocument;

    fn artifacts(screenshot: Option<Vec<u8>>) -> Artifacts {
        Artifacts {
            html: "<html><body>replica</body></html>".into(),
            metadata: Metadata {
                url: "https://shop.example.com/".into(),
                ..Metadata::default()
            },
            screenshot,
            index: SearchIndex::build(vec![IndexDocument {
                id: 0,
                title: "Tee".into(),
                description: String::new(),
                url: None,
                image: None,
                price: None,
            }]),
        }
    }

    fn tempdir() -> tempfile::TempDir {
        match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        }
    }

    #[test]
    fn slugs_must_be_basenames() {
        assert!(validate_slug("acme-home_2").is_ok());
        assert!(validate_slug("v1.2").is_ok());
        for bad in ["", "../etc", "a/b", ".hidden", "a..b", "sp ace"] {
            assert!(matches!(validate_slug(bad), Err(Error::InvalidSlug(_))), "{bad}");
        }
    }

    #[test]
    fn writes_every_artifact() {
        let dir = tempdir();
        let paths = match write_artifacts(dir.path(), "acme", artifacts(Some(vec![0x89, b'P', b'N', b'G']))) {
            Ok(p) => p,
            Err(e) => panic!("write failed: {e}"),
        };
        for file in paths.files() {
            assert!(file.exists(), "{}", file.display());
        }
        assert_eq!(paths.index, dir.path().join("acme-search-index.json"));

        let json = fs::read_to_string(&paths.metadata).unwrap_or_default();
        let meta: Metadata = match serde_json::from_str(&json) {
            Ok(m) => m,
            Err(e) => panic!("metadata: {e}"),
        };
        assert_eq!(meta.screenshot_path.as_deref(), Some("acme.png"));
        assert_eq!(meta.search_index_path.as_deref(), Some("acme-search-index.json"));
        assert_eq!(meta.state, JobState::Done);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .map(|it| it.filter_map(std::result::Result::ok).map(|e| e.file_name()).collect())
            .unwrap_or_default();
        assert!(leftovers.iter().all(|n| !n.to_string_lossy().contains("staging")));
    }

    #[test]
    fn missing_screenshot_is_not_an_error() {
        let dir = tempdir();
        let paths = match write_artifacts(dir.path(), "plain", artifacts(None)) {
            Ok(p) => p,
            Err(e) => panic!("write failed: {e}"),
        };
        assert!(paths.screenshot.is_none());
        assert!(!dir.path().join("plain.png").exists());
        let json = fs::read_to_string(&paths.metadata).unwrap_or_default();
        assert!(json.contains("\"screenshotPath\": null"));
    }

    #[test]
    fn unwritable_output_is_fatal() {
        let dir = tempdir();
        let blocker = dir.path().join("out");
        if let Err(e) = fs::write(&blocker, b"file, not a directory") {
            panic!("setup: {e}");
        }
        let err = write_artifacts(&blocker, "acme", artifacts(None));
        assert!(matches!(err, Err(Error::WriteFailure { .. })));
        assert!(err.err().is_some_and(|e| e.is_fatal()));
    }

    #[test]
    fn unpromoted_staging_is_removed() {
        let dir = tempdir();
        let staged_dir = {
            let staging = match Staging::create(dir.path(), "gone") {
                Ok(s) => s,
                Err(e) => panic!("staging: {e}"),
            };
            if let Err(e) = staging.write("gone.html", b"<p>partial</p>") {
                panic!("write: {e}");
            }
            staging.path().to_path_buf()
        };
        assert!(!staged_dir.exists());
        assert!(!dir.path().join("gone.html").exists());
    }

    #[test]
    fn concurrent_jobs_get_their_own_staging() {
        let dir = tempdir();
        let first = Staging::create(dir.path(), "acme");
        let second = Staging::create(dir.path(), "acme");
        match (first, second) {
            (Ok(a), Ok(b)) => assert_ne!(a.path(), b.path()),
            _ => panic!("staging directories not created"),
        }
    }

    #[test]
    fn failed_promotion_restores_previous_artifacts() {
        let dir = tempdir();
        if let Err(e) = fs::write(dir.path().join("acme.html"), b"old replica") {
            panic!("setup: {e}");
        }
        // A directory in place of the metadata file makes the last rename fail.
        if let Err(e) = fs::create_dir_all(dir.path().join("acme.json").join("occupied")) {
            panic!("setup: {e}");
        }

        let result = write_artifacts(dir.path(), "acme", artifacts(None));
        assert!(matches!(result, Err(Error::WriteFailure { .. })));

        let html = fs::read_to_string(dir.path().join("acme.html")).unwrap_or_default();
        assert_eq!(html, "old replica");
        assert!(!dir.path().join("acme-search-index.json").exists());
        assert!(!dir.path().join("pe-search.js").exists());

        let leftovers: Vec<String> = fs::read_dir(dir.path())
            .map(|it| {
                it.filter_map(std::result::Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        assert!(leftovers.iter().all(|n| !n.contains("staging")), "{leftovers:?}");
    }

    #[tokio::test]
    async fn publish_uploads_every_file() {
        let out = tempdir();
        let bucket = tempdir();
        let paths = match write_artifacts(out.path(), "acme", artifacts(None)) {
            Ok(p) => p,
            Err(e) => panic!("write failed: {e}"),
        };
        let store = LocalObjectStore::new(bucket.path(), "https://cdn.example.com/");
        let urls = match publish_artifacts(&store, &paths, "replicas/acme").await {
            Ok(u) => u,
            Err(e) => panic!("publish failed: {e}"),
        };
        assert_eq!(urls.len(), 4);
        assert_eq!(urls[0], "https://cdn.example.com/replicas/acme/acme.html");
        assert!(bucket.path().join("replicas/acme/pe-search.js").exists());
    }

    #[tokio::test]
    async fn store_rejects_escaping_keys() {
        let bucket = tempdir();
        let store = LocalObjectStore::new(bucket.path(), "https://cdn.example.com");
        let result = store.store(b"x".to_vec(), "../outside.txt", "text/plain").await;
        assert!(matches!(result, Err(Error::InvalidObjectKey(ref key)) if key == "../outside.txt"));
        let empty = store.store(b"x".to_vec(), "a//b", "text/plain").await;
        assert!(matches!(empty, Err(Error::InvalidObjectKey(_))));
    }
}
