//! Extraction job orchestration.
//!
//! One job walks `created → loading → stabilizing → surveying → sanitizing →
//! reconstructing → indexing → writing → done`. Browser stages tolerate
//! partial pages; every classifier stage after the snapshot records its
//! problems as warnings and hands an empty or partial result downstream.
//! Only session crashes, write failures and the job timeout end a job early.

use std::path::Path;

use dom_query::Document;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::browser::scripts::DOCUMENT_TITLE;
use crate::browser::{lazy_scroll, prepare_snapshot, wait_for_stability, PageDriver};
use crate::dom;
use crate::error::{Error, Result};
use crate::html_processing::{sanitize, strip_pipeline_attributes};
use crate::options::Options;
use crate::output::{validate_slug, write_artifacts, ArtifactPaths, Artifacts};
use crate::patterns::normalize_whitespace;
use crate::platform::PlatformClassifier;
use crate::product::{has_grid_evidence, resolve_products, CardScoring};
use crate::result::{JobState, Metadata};
use crate::search::{collect_documents, inject_index_script, search_endpoint, synthesize_search, SearchIndex};
use crate::selector::product::ProductSelectorTable;
use crate::survey::survey;
use crate::video::{reconstruct_videos, resolve_videos, WidgetTable};

/// Immutable classifier configuration shared by the stages of a job.
#[derive(Debug, Clone, Default)]
pub struct ClassifierTables {
    pub platforms: PlatformClassifier,
    pub widgets: WidgetTable,
    pub products: ProductSelectorTable,
}

/// A reconstructed page that has not been written yet.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Replica HTML without the index script reference.
    pub html: String,
    pub metadata: Metadata,
    pub index: SearchIndex,
    /// Result cap handed to the query script.
    pub max_results: usize,
}

impl Reconstruction {
    /// Reference `slug`'s index from the HTML and write every artifact.
    pub fn write(self, out_dir: &Path, slug: &str, screenshot: Option<Vec<u8>>) -> Result<ArtifactPaths> {
        validate_slug(slug)?;
        let doc = dom::parse(&self.html);
        let param = self.metadata.search.as_ref().map(|s| s.param.as_str());
        inject_index_script(&doc, slug, self.max_results, param);
        write_artifacts(
            out_dir,
            slug,
            Artifacts {
                html: doc.html().to_string(),
                metadata: self.metadata,
                screenshot,
                index: self.index,
            },
        )
    }
}

/// Forward-only job state with logging.
struct JobTracker {
    state: JobState,
}

impl JobTracker {
    fn new() -> Self {
        Self {
            state: JobState::Created,
        }
    }

    fn advance(&mut self, next: JobState, metadata: &mut Metadata) {
        if self.state.can_advance_to(next) {
            debug!(from = ?self.state, to = ?next, "job state");
            self.state = next;
            metadata.state = next;
        } else {
            warn!(from = ?self.state, to = ?next, "illegal job transition ignored");
        }
    }
}

/// Accept absolute http(s) URLs only.
pub(crate) fn parse_page_url(url: &str) -> Result<Url> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => Ok(parsed),
        _ => Err(Error::InvalidUrl(url.to_string())),
    }
}

fn record_warning(metadata: &mut Metadata, err: &Error) {
    warn!(error = %err, "stage degraded");
    metadata.warnings.push(err.to_string());
}

/// Run a job against `driver` under the job deadline.
///
/// The driver is closed whatever the outcome. Artifacts are only staged by
/// the final synchronous step, so a deadline that fires earlier leaves
/// nothing on disk.
pub(crate) async fn run_job<D: PageDriver + ?Sized>(
    driver: &mut D,
    page_url: &Url,
    slug: &str,
    options: &Options,
    tables: &ClassifierTables,
    deadline: Instant,
) -> Result<ArtifactPaths> {
    let outcome = timeout_at(deadline, run_live(driver, page_url, slug, options, tables)).await;
    if let Err(e) = driver.close().await {
        debug!(error = %e, "session close failed");
    }
    match outcome {
        Ok(result) => result,
        Err(_) => {
            warn!(url = %page_url, "job timeout fired, staged output discarded");
            Err(Error::JobTimeout(options.job_timeout()))
        }
    }
}

#[instrument(skip(driver, options, tables))]
async fn run_live<D: PageDriver + ?Sized>(
    driver: &mut D,
    page_url: &Url,
    slug: &str,
    options: &Options,
    tables: &ClassifierTables,
) -> Result<ArtifactPaths> {
    let mut tracker = JobTracker::new();
    let mut metadata = Metadata {
        url: page_url.to_string(),
        extracted_at: chrono::Utc::now(),
        ..Metadata::default()
    };

    tracker.advance(JobState::Loading, &mut metadata);
    match driver.navigate(page_url.as_str(), options.browser.navigation_timeout()).await {
        Ok(()) => info!("page loaded"),
        Err(e) if e.is_fatal() => {
            tracker.advance(JobState::Failed, &mut metadata);
            return Err(e);
        }
        Err(e) => record_warning(&mut metadata, &e),
    }

    tracker.advance(JobState::Stabilizing, &mut metadata);
    lazy_scroll(driver, &options.wait).await;
    metadata.stability = Some(wait_for_stability(driver, &options.wait).await);
    match prepare_snapshot(driver).await {
        Ok(prep) => debug!(shadow_roots = prep.shadow_roots, videos = prep.videos, "snapshot prepared"),
        Err(e) => record_warning(&mut metadata, &e),
    }
    let live_title = match driver.evaluate(DOCUMENT_TITLE).await {
        Ok(value) => value.as_str().map(normalize_whitespace).filter(|t| !t.is_empty()),
        Err(e) => {
            debug!(error = %e, "document.title unavailable");
            None
        }
    };
    let screenshot = if options.capture_screenshot {
        match driver.screenshot().await {
            Ok(png) => Some(png),
            Err(e) => {
                record_warning(&mut metadata, &e);
                None
            }
        }
    } else {
        None
    };
    let html = match driver.content().await {
        Ok(html) => html,
        Err(e) => {
            tracker.advance(JobState::Failed, &mut metadata);
            return Err(e);
        }
    };
    metadata.title = live_title;

    let reconstruction = process_snapshot(&html, page_url, options, tables, &mut tracker, metadata);

    let mut reconstruction = reconstruction;
    tracker.advance(JobState::Writing, &mut reconstruction.metadata);
    let written = reconstruction.write(&options.output_dir, slug, screenshot);
    match written {
        Ok(paths) => {
            info!(html = %paths.html.display(), "job done");
            Ok(paths)
        }
        Err(e) => {
            warn!(error = %e, "job failed while writing");
            Err(e)
        }
    }
}

/// Offline entry: run every DOM stage over captured HTML.
pub(crate) fn reconstruct_offline(html: &str, page_url: &Url, options: &Options, tables: &ClassifierTables) -> Reconstruction {
    let mut tracker = JobTracker::new();
    let mut metadata = Metadata {
        url: page_url.to_string(),
        extracted_at: chrono::Utc::now(),
        ..Metadata::default()
    };
    tracker.advance(JobState::Loading, &mut metadata);
    tracker.advance(JobState::Stabilizing, &mut metadata);
    process_snapshot(html, page_url, options, tables, &mut tracker, metadata)
}

/// Surveying through indexing, on one parsed document.
fn process_snapshot(
    html: &str,
    page_url: &Url,
    options: &Options,
    tables: &ClassifierTables,
    tracker: &mut JobTracker,
    mut metadata: Metadata,
) -> Reconstruction {
    let doc = dom::parse(html);
    let classifier = &options.classifier;

    tracker.advance(JobState::Surveying, &mut metadata);
    let platform = tables.platforms.classify(html, page_url.as_str());
    metadata.apply_platform(&platform);
    if metadata.title.is_none() {
        metadata.title = page_title(&doc);
    }
    let description = page_description(&doc);

    let surveyed = survey(&doc, classifier.markup_cap);
    let videos = resolve_videos(&doc, page_url, &tables.widgets, classifier.video_sample_cap);
    let blocks = crate::blocks::classify_blocks(&surveyed.assets, &surveyed.search_assets, &classifier.confidence);

    if has_grid_evidence(&blocks, &surveyed.assets, &platform) {
        let scoring = CardScoring {
            base: page_url,
            threshold: classifier.product_card_threshold,
            markup_cap: classifier.markup_cap,
        };
        let resolution = resolve_products(&doc, &platform.platform, &tables.products, scoring);
        if resolution.cards.is_empty() {
            let looked_for = resolution.selector.clone().unwrap_or_else(|| "product cards".to_string());
            record_warning(&mut metadata, &Error::SelectorNotFound(looked_for));
        }
        metadata.products = resolution.cards;
        metadata.product_selector = resolution.selector;
    }
    info!(
        platform = %metadata.platform,
        assets = surveyed.assets.len(),
        videos = videos.len(),
        blocks = blocks.len(),
        products = metadata.products.len(),
        "survey done"
    );

    tracker.advance(JobState::Sanitizing, &mut metadata);
    let cleaned = sanitize(&doc, page_url);
    debug!(
        removed = cleaned.removed,
        scripts = cleaned.scripts_removed,
        urls = cleaned.urls_rewritten,
        "sanitized"
    );

    tracker.advance(JobState::Reconstructing, &mut metadata);
    let rebuilt = reconstruct_videos(&doc, &videos);
    for index in &rebuilt.skipped {
        record_warning(
            &mut metadata,
            &Error::extraction("reconstructing", format!("no placeholder left for video {index}")),
        );
    }
    if rebuilt.orphaned_markers > 0 {
        record_warning(
            &mut metadata,
            &Error::extraction("reconstructing", format!("{} orphaned video markers", rebuilt.orphaned_markers)),
        );
    }

    let endpoint = search_endpoint(page_url, &platform.platform, &options.search.overrides);
    let synthesis = synthesize_search(&doc, page_url, &endpoint, &options.search);
    if !surveyed.search_assets.is_empty() && synthesis.inputs_wired == 0 {
        record_warning(
            &mut metadata,
            &Error::extraction("search synthesis", "search assets found but no input wired"),
        );
    }
    debug!(
        wired = synthesis.inputs_wired,
        forms = synthesis.forms_created,
        fallback = synthesis.fallback_injected,
        "search synthesized"
    );
    metadata.search = synthesis.descriptor;

    tracker.advance(JobState::Indexing, &mut metadata);
    let documents = collect_documents(
        &metadata.products,
        metadata.title.as_deref(),
        description.as_deref(),
        page_url.as_str(),
    );
    let index = SearchIndex::build(documents);
    strip_pipeline_attributes(&doc);

    metadata.videos = videos;
    metadata.blocks = blocks;
    metadata.assets = surveyed.assets;
    metadata.collections = surveyed.collections;

    Reconstruction {
        html: doc.html().to_string(),
        metadata,
        index,
        max_results: options.search.max_results,
    }
}

fn page_title(doc: &Document) -> Option<String> {
    let title = normalize_whitespace(&doc.select("head title").text());
    if !title.is_empty() {
        return Some(title);
    }
    meta_content(doc, "meta[property='og:title']")
}

fn page_description(doc: &Document) -> Option<String> {
    meta_content(doc, "meta[name='description']").or_else(|| meta_content(doc, "meta[property='og:description']"))
}

fn meta_content(doc: &Document, css: &str) -> Option<String> {
    doc.select(css)
        .iter()
        .filter_map(|m| dom::non_empty_attribute(&m, "content"))
        .map(|c| normalize_whitespace(&c))
        .find(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title> Acme  Store </title>
        <meta name="description" content="Mugs and more">
        <script src="https://www.googletagmanager.com/gtag/js"></script></head>
        <body>
          <header class="site-header"><form action="/search"><input type="search" name="q"></form></header>
          <section class="hero-banner"><h1>Big sale</h1><img src="/hero.jpg"><a href="/shop">Shop now</a></section>
          <div class="video-wrap"><iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe></div>
        </body></html>"#;

    fn url() -> Url {
        match Url::parse("https://acme.example.com/") {
            Ok(u) => u,
            Err(e) => panic!("url: {e}"),
        }
    }

    #[test]
    fn urls_must_be_absolute_http() {
        assert!(parse_page_url("https://acme.example.com/").is_ok());
        for bad in ["ftp://acme.example.com/", "/relative", "not a url", "file:///etc/passwd"] {
            assert!(matches!(parse_page_url(bad), Err(Error::InvalidUrl(_))), "{bad}");
        }
    }

    #[test]
    fn tracker_ignores_backward_moves() {
        let mut meta = Metadata::default();
        let mut tracker = JobTracker::new();
        tracker.advance(JobState::Loading, &mut meta);
        tracker.advance(JobState::Created, &mut meta);
        assert_eq!(tracker.state, JobState::Loading);
        assert_eq!(meta.state, JobState::Loading);
    }

    #[test]
    fn offline_pass_fills_metadata() {
        let rebuilt = reconstruct_offline(PAGE, &url(), &Options::default(), &ClassifierTables::default());
        let meta = &rebuilt.metadata;
        assert_eq!(meta.title.as_deref(), Some("Acme Store"));
        assert_eq!(meta.state, JobState::Indexing);
        assert_eq!(meta.videos.len(), 1);
        assert!(meta.search.is_some());
        assert_eq!(rebuilt.index.documents.len(), 1);
        assert_eq!(rebuilt.index.documents[0].description, "Mugs and more");

        assert!(!rebuilt.html.contains("data-pe-video=\""));
        assert!(!rebuilt.html.contains("data-pe-key"));
        assert!(!rebuilt.html.contains("googletagmanager"));
        assert!(rebuilt.html.contains("youtube"));
    }
}
