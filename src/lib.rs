//! # page-replica
//!
//! Render a live page in a headless browser and rebuild it as a portable,
//! script-free replica.
//!
//! A job loads one URL, waits for the DOM to settle, classifies what is on
//! the page (platform, assets, videos, blocks, product cards, search boxes),
//! strips third-party chrome, and writes a self-contained copy that can be
//! served from any origin.
//!
//! ## Quick Start
//!
//! Live extraction needs Chrome or Chromium on the machine:
//!
//! ```rust,no_run
//! # async fn run() -> page_replica::Result<()> {
//! let html_path = page_replica::extract("https://shop.example.com/", "shop-home").await?;
//! println!("replica written to {}", html_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! Saved pages go through the same stages without a browser:
//!
//! ```rust
//! use page_replica::{reconstruct_html, Options};
//!
//! let html = r#"<html><head><title>Mugs</title></head>
//! <body><form action="/find"><input type="search" name="q"></form>
//! <video src="/media/intro.mp4" controls></video></body></html>"#;
//!
//! let replica = reconstruct_html(html, "https://mugs.example.com/", &Options::default())?;
//! assert_eq!(replica.metadata.title.as_deref(), Some("Mugs"));
//! assert_eq!(replica.metadata.videos.len(), 1);
//! assert!(replica.metadata.search.is_some());
//! # Ok::<(), page_replica::Error>(())
//! ```
//!
//! ## Artifacts
//!
//! Each job writes `{slug}.html`, `{slug}.json`, `{slug}.png` (when the
//! screenshot succeeds), `{slug}-search-index.json` and the shared
//! `pe-search.js` into `Options::output_dir`.

mod error;
mod extract;
mod options;
mod patterns;
mod result;

/// Thin adapter over `dom_query` selections.
pub mod dom;

/// Browser session, stability wait and page scripts.
pub mod browser;

/// Selector rules for search boxes, product cards and third-party chrome.
pub mod selector;

/// Platform and framework signatures.
pub mod platform;

/// Single-pass asset survey.
pub mod survey;

/// Video placeholder markers, source discovery and embeds.
pub mod video;

/// Block typing over surveyed assets.
pub mod blocks;

/// Product card resolution.
pub mod product;

/// DOM sanitizing and URL absolutization.
pub mod html_processing;

/// Search synthesis and the static search index.
pub mod search;

/// Artifact writer and object store.
pub mod output;

/// URL utilities for validation, resolution, and normalization.
pub mod url_utils;

/// Charset detection for offline input.
pub mod encoding;

use std::path::PathBuf;

use tokio::time::Instant;

pub use browser::{BrowserSession, PageDriver};
pub use error::{Error, Result};
pub use extract::{ClassifierTables, Reconstruction};
pub use options::{BlockConfidence, BrowserOptions, ClassifierOptions, Options, SearchOptions, SearchOverride, WaitOptions};
pub use output::{ArtifactPaths, LocalObjectStore, ObjectStore};
pub use result::{
    Asset, AssetKind, Block, BlockType, CardClue, Dimensions, FormSummary, JobState, Metadata, PlaybackFlags,
    ProductCard, RawCollections, SearchDescriptor, StabilityReport, VideoKind, VideoRecord,
};
pub use search::SearchIndex;

/// Extract `url` into `output/{slug}.*` with default options.
///
/// Returns the path of the replica HTML.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> page_replica::Result<()> {
/// let path = page_replica::extract("https://brand.example.com/", "brand").await?;
/// assert!(path.ends_with("brand.html"));
/// # Ok(())
/// # }
/// ```
pub async fn extract(url: &str, slug: &str) -> Result<PathBuf> {
    extract_with_options(url, slug, &Options::default()).await
}

/// Extract `url` with custom options, launching a headless browser.
///
/// The URL and slug are checked before launch. Launch counts against the
/// job timeout, and the browser is closed on every path out.
pub async fn extract_with_options(url: &str, slug: &str, options: &Options) -> Result<PathBuf> {
    let page_url = extract::parse_page_url(url)?;
    output::validate_slug(slug)?;
    let deadline = Instant::now() + options.job_timeout();

    let mut session = match tokio::time::timeout_at(deadline, BrowserSession::launch(&options.browser)).await {
        Ok(session) => session?,
        Err(_) => return Err(Error::JobTimeout(options.job_timeout())),
    };
    let tables = ClassifierTables::default();
    let paths = extract::run_job(&mut session, &page_url, slug, options, &tables, deadline).await?;
    Ok(paths.html)
}

/// Extract through an existing driver, e.g. a pooled browser or a test double.
///
/// The driver is closed when the job ends.
pub async fn extract_with_driver<D: PageDriver + ?Sized>(
    driver: &mut D,
    url: &str,
    slug: &str,
    options: &Options,
) -> Result<ArtifactPaths> {
    let page_url = extract::parse_page_url(url)?;
    output::validate_slug(slug)?;
    let deadline = Instant::now() + options.job_timeout();
    let tables = ClassifierTables::default();
    extract::run_job(driver, &page_url, slug, options, &tables, deadline).await
}

/// Rebuild captured HTML without a browser.
///
/// Runs survey, video resolution, block and product classification,
/// sanitizing, reconstruction, search synthesis and indexing. Nothing is
/// written; call `Reconstruction::write` for artifacts.
pub fn reconstruct_html(html: &str, url: &str, options: &Options) -> Result<Reconstruction> {
    reconstruct_html_with_tables(html, url, options, &ClassifierTables::default())
}

/// `reconstruct_html` with custom classifier tables.
pub fn reconstruct_html_with_tables(
    html: &str,
    url: &str,
    options: &Options,
    tables: &ClassifierTables,
) -> Result<Reconstruction> {
    let page_url = extract::parse_page_url(url)?;
    Ok(extract::reconstruct_offline(html, &page_url, options, tables))
}

/// Rebuild raw HTML bytes, detecting their charset first.
///
/// `content_type` is an optional HTTP `Content-Type` value.
///
/// # Example
///
/// ```rust
/// let bytes = b"<html><head><meta charset=\"windows-1252\"><title>Caf\xE9</title></head><body></body></html>";
/// let replica = page_replica::reconstruct_bytes(bytes, None, "https://cafe.example.com/", &page_replica::Options::default())?;
/// assert_eq!(replica.metadata.title.as_deref(), Some("Café"));
/// # Ok::<(), page_replica::Error>(())
/// ```
pub fn reconstruct_bytes(html: &[u8], content_type: Option<&str>, url: &str, options: &Options) -> Result<Reconstruction> {
    let decoded = encoding::decode_html(html, content_type);
    reconstruct_html(&decoded, url, options)
}
