//! Configuration options for extraction jobs.
//!
//! The `Options` struct controls browser behavior, wait bounds, classifier
//! thresholds and search synthesis. Every struct derives `Deserialize` with
//! `#[serde(default)]`, so a config file only needs the fields it changes.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration options for an extraction job.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use page_replica::Options;
///
/// let options = Options {
///     capture_screenshot: false,
///     job_timeout_ms: 30_000,
///     ..Options::default()
/// };
/// assert_eq!(options.job_timeout(), std::time::Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Browser launch and navigation settings.
    pub browser: BrowserOptions,

    /// Lazy-load scrolling and DOM stability bounds.
    pub wait: WaitOptions,

    /// Block and product-card classification thresholds.
    pub classifier: ClassifierOptions,

    /// Search form synthesis and static index settings.
    pub search: SearchOptions,

    /// Directory receiving the emitted artifacts.
    ///
    /// Default: `output`
    pub output_dir: PathBuf,

    /// Capture a full-page PNG screenshot. Failure never fails the job.
    ///
    /// Default: `true`
    pub capture_screenshot: bool,

    /// Upper bound for the whole job, browser launch included.
    ///
    /// When it fires the session is force-closed and staged output is
    /// discarded.
    ///
    /// Default: `180000` (3 min)
    pub job_timeout_ms: u64,
}

impl Options {
    /// Job-level timeout as a `Duration`.
    #[must_use]
    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            browser: BrowserOptions::default(),
            wait: WaitOptions::default(),
            classifier: ClassifierOptions::default(),
            search: SearchOptions::default(),
            output_dir: PathBuf::from("output"),
            capture_screenshot: true,
            job_timeout_ms: 180_000,
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Explicit Chrome/Chromium executable. Auto-detected when `None`.
    ///
    /// Default: `None`
    pub executable: Option<PathBuf>,

    /// Viewport width in CSS pixels.
    ///
    /// Default: `1440`
    pub window_width: u32,

    /// Viewport height in CSS pixels.
    ///
    /// Default: `900`
    pub window_height: u32,

    /// Override the browser user agent.
    ///
    /// Default: `None`
    pub user_agent: Option<String>,

    /// Apply the resource block-list while loading.
    ///
    /// Default: `true`
    pub block_resources: bool,

    /// URL patterns (CDP wildcard syntax) refused during page load.
    ///
    /// Default: web fonts, tracking pixels and common analytics hosts.
    pub blocked_url_patterns: Vec<String>,

    /// Upper bound for the initial navigation. Exceeding it is tolerated.
    ///
    /// Default: `30000`
    pub navigation_timeout_ms: u64,

    /// Upper bound for a single CDP request (evaluate, content, screenshot).
    ///
    /// Default: `20000`
    pub request_timeout_ms: u64,
}

impl BrowserOptions {
    /// Navigation timeout as a `Duration`.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Per-request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            executable: None,
            window_width: 1440,
            window_height: 900,
            user_agent: None,
            block_resources: true,
            blocked_url_patterns: default_blocked_url_patterns(),
            navigation_timeout_ms: 30_000,
            request_timeout_ms: 20_000,
        }
    }
}

fn default_blocked_url_patterns() -> Vec<String> {
    [
        "*.woff",
        "*.woff2",
        "*.ttf",
        "*.otf",
        "*.eot",
        "*google-analytics.com*",
        "*googletagmanager.com/gtag*",
        "*doubleclick.net*",
        "*connect.facebook.net*",
        "*facebook.com/tr*",
        "*analytics.tiktok.com*",
        "*hotjar.com*",
        "*clarity.ms*",
        "*segment.io*",
        "*bat.bing.com*",
        "*snap.licdn.com*",
        "*/pixel.gif*",
        "*/1x1.gif*",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Bounds for lazy-load scrolling and the stability wait.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Number of viewport-height scroll steps used to trigger lazy loading.
    ///
    /// Default: `12`
    pub scroll_steps: usize,

    /// Pause after each scroll step.
    ///
    /// Default: `250`
    pub scroll_delay_ms: u64,

    /// Interval between stability polls.
    ///
    /// Default: `250`
    pub poll_interval_ms: u64,

    /// How long the DOM must go without mutations to count as stable.
    ///
    /// Default: `1000`
    pub quiet_period_ms: u64,

    /// Upper bound for the stability wait. Reaching it is not an error.
    ///
    /// Default: `8000`
    pub max_wait_ms: u64,

    /// Widget containers that must have mounted content before the page is
    /// considered stable. Containers absent from the page are ignored.
    ///
    /// Default: common review and shoppable-video widget mounts.
    pub widget_selectors: Vec<String>,
}

impl WaitOptions {
    /// Poll interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Maximum stability wait as a `Duration`.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            scroll_steps: 12,
            scroll_delay_ms: 250,
            poll_interval_ms: 250,
            quiet_period_ms: 1_000,
            max_wait_ms: 8_000,
            widget_selectors: [
                ".yotpo-main-widget",
                ".okeReviews",
                ".junip-product-reviews",
                "#looxReviews",
                ".tolstoy-carousel",
                "[class*='videowise']",
                ".keen-slider",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Fixed confidences attached to each block rule.
///
/// They let downstream consumers filter weak guesses; nothing tunes them at
/// runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlockConfidence {
    /// Hero block without hero-like classnames. Default: `0.8`
    pub hero: f64,
    /// Hero block whose classnames mention hero/banner/main. Default: `0.95`
    pub hero_named: f64,
    /// Default: `0.85`
    pub product_grid: f64,
    /// Default: `0.9`
    pub form_block: f64,
    /// Default: `0.7`
    pub cta: f64,
    /// Default: `0.9`
    pub search: f64,
    /// Default: `0.5`
    pub generic: f64,
}

impl Default for BlockConfidence {
    fn default() -> Self {
        Self {
            hero: 0.8,
            hero_named: 0.95,
            product_grid: 0.85,
            form_block: 0.9,
            cta: 0.7,
            search: 0.9,
            generic: 0.5,
        }
    }
}

/// Classification thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Minimum clue score for a product card to be kept.
    ///
    /// Default: `3`
    pub product_card_threshold: u32,

    /// Cap on the `outerHTML` captured per asset, in characters.
    ///
    /// Default: `300`
    pub markup_cap: usize,

    /// Cap on the markup sample kept per video record.
    ///
    /// Default: `500`
    pub video_sample_cap: usize,

    /// Confidence per block rule.
    pub confidence: BlockConfidence,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            product_card_threshold: 3,
            markup_cap: 300,
            video_sample_cap: 500,
            confidence: BlockConfidence::default(),
        }
    }
}

/// Replaces the canonical search path for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchOverride {
    /// Host the override applies to (`www.` is ignored when matching).
    pub domain: String,
    /// Search path on that host, e.g. `/search`.
    pub path: String,
    /// Query parameter name, e.g. `q`.
    pub param: String,
}

/// Search synthesis and static index settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Per-domain overrides of the canonical search endpoint.
    ///
    /// Default: empty
    pub overrides: Vec<SearchOverride>,

    /// Inject the cross-origin fallback handler script.
    ///
    /// Default: `true`
    pub inject_fallback: bool,

    /// Attempts the fallback handler makes to find a search input.
    ///
    /// Default: `20`
    pub fallback_attempts: u32,

    /// Interval between fallback attempts.
    ///
    /// Default: `250`
    pub fallback_interval_ms: u64,

    /// Maximum hits returned by the static index query.
    ///
    /// Default: `8`
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            overrides: Vec::new(),
            inject_fallback: true,
            fallback_attempts: 20,
            fallback_interval_ms: 250,
            max_results: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = Options::default();

        assert!(opts.capture_screenshot);
        assert_eq!(opts.job_timeout(), Duration::from_secs(180));
        assert_eq!(opts.output_dir, PathBuf::from("output"));

        assert!(opts.browser.block_resources);
        assert!(opts.browser.blocked_url_patterns.iter().any(|p| p == "*.woff2"));
        assert_eq!(opts.browser.navigation_timeout(), Duration::from_secs(30));

        assert_eq!(opts.wait.scroll_steps, 12);
        assert_eq!(opts.wait.max_wait(), Duration::from_secs(8));

        assert_eq!(opts.classifier.product_card_threshold, 3);
        assert_eq!(opts.classifier.markup_cap, 300);
        assert!((opts.classifier.confidence.generic - 0.5).abs() < f64::EPSILON);
        assert!((opts.classifier.confidence.hero_named - 0.95).abs() < f64::EPSILON);

        assert!(opts.search.overrides.is_empty());
        assert!(opts.search.inject_fallback);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{
            "capture_screenshot": false,
            "wait": { "max_wait_ms": 2000 },
            "search": { "overrides": [{ "domain": "shop.example", "path": "/find", "param": "term" }] }
        }"#;
        let opts: Options = match serde_json::from_str(json) {
            Ok(o) => o,
            Err(e) => panic!("config should parse: {e}"),
        };

        assert!(!opts.capture_screenshot);
        assert_eq!(opts.wait.max_wait_ms, 2000);
        assert_eq!(opts.wait.quiet_period_ms, 1000);
        assert_eq!(opts.search.overrides.len(), 1);
        assert_eq!(opts.search.overrides[0].param, "term");
        assert_eq!(opts.classifier.product_card_threshold, 3);
    }

    #[test]
    fn test_custom_thresholds() {
        let opts = Options {
            classifier: ClassifierOptions {
                product_card_threshold: 4,
                markup_cap: 120,
                ..ClassifierOptions::default()
            },
            ..Options::default()
        };

        assert_eq!(opts.classifier.product_card_threshold, 4);
        assert_eq!(opts.classifier.markup_cap, 120);
        assert_eq!(opts.classifier.video_sample_cap, 500);
    }
}
