//! DOM Sanitizer
//!
//! Cleans the captured document for replay from another origin: injected
//! third-party chrome is removed, scripts are dropped, and every relative URL
//! is resolved against the page URL.
//!
//! Runs after the Video/Widget Resolver. Elements carrying a placeholder
//! marker, or containing one, are never removed.

use std::collections::HashSet;

use dom_query::{Document, NodeId, Selection};
use tracing::debug;
use url::Url;

use crate::browser::scripts::{SHADOW_HOST_ATTR, SHADOW_ROOT_ATTR};
use crate::dom;
use crate::selector::discard::{DISCARD_SELECTORS, THIRD_PARTY_CHROME};
use crate::selector::matches_any;
use crate::selector::utils::attr;
use crate::survey::KEY_ATTR;
use crate::url_utils::{absolutize_srcset, create_absolute_url, get_domain_url, host_matches};
use crate::video::sources::{is_video_host, CURRENT_SRC_ATTR, LIVE_FLAGS_ATTR};
use crate::video::MARKER_ATTR;

/// Attributes holding a single URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "poster", "action", "data-src"];

/// Attributes holding a candidate list.
const SRCSET_ATTRIBUTES: &[&str] = &["srcset", "data-srcset"];

/// Hosts whose player loaders are kept.
const VIDEO_SCRIPT_HOSTS: &[&str] = &[
    "youtube.com",
    "youtube-nocookie.com",
    "vimeo.com",
    "vimeocdn.com",
    "wistia.com",
    "wistia.net",
];

/// Preload hints for scripts that no longer exist.
const SCRIPT_HINTS: &str = "link[rel='modulepreload'], link[rel='preload'][as='script']";

/// Counts from one sanitizer pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Third-party chrome subtrees removed.
    pub removed: usize,
    /// Script elements removed.
    pub scripts_removed: usize,
    /// URL attributes rewritten.
    pub urls_rewritten: usize,
}

/// Run every sanitizer step over `doc`.
pub fn sanitize(doc: &Document, base: &Url) -> SanitizeReport {
    let removed = remove_third_party_chrome(doc);
    let scripts_removed = remove_scripts(doc);
    strip_event_handlers(doc);
    let urls_rewritten = absolutize_urls(doc, base);

    let report = SanitizeReport {
        removed,
        scripts_removed,
        urls_rewritten,
    };
    debug!(?report, "document sanitized");
    report
}

/// Whether `el` is, or contains, a placeholder-marked element.
#[must_use]
pub fn is_protected(el: &Selection) -> bool {
    el.has_attr(MARKER_ATTR) || el.select(&format!("[{MARKER_ATTR}]")).exists()
}

/// Remove the fixed vendor list and anything the vocabulary rules flag.
pub fn remove_third_party_chrome(doc: &Document) -> usize {
    let mut doomed: Vec<Selection> = DISCARD_SELECTORS
        .iter()
        .flat_map(|css| dom::try_select_all(doc, css))
        .collect();

    for node in doc.select("body *").nodes() {
        let el = Selection::from(*node);
        if matches_any(&el, THIRD_PARTY_CHROME) {
            doomed.push(el);
        }
    }

    let mut seen: HashSet<NodeId> = HashSet::new();
    doomed.retain(|el| dom::node_id(el).is_some_and(|id| seen.insert(id)));
    doomed.retain(|el| !is_protected(el));
    let doomed = dom::outermost(doomed);
    for el in &doomed {
        dom::remove(el);
    }
    doomed.len()
}

/// Drop scripts, sparing marker-tagged ones, video-host loaders and JSON-LD.
pub fn remove_scripts(doc: &Document) -> usize {
    let mut removed = 0;
    for script in doc.select("script").iter() {
        if keeps_script(&script) {
            continue;
        }
        dom::remove(&script);
        removed += 1;
    }
    doc.select(SCRIPT_HINTS).remove();
    removed
}

fn keeps_script(script: &Selection) -> bool {
    script.has_attr(MARKER_ATTR)
        || dom::has_ancestor(script, |a| a.has_attr(MARKER_ATTR))
        || is_video_loader(&attr(script, "src"))
        || attr(script, "type").eq_ignore_ascii_case("application/ld+json")
}

fn is_video_loader(src: &str) -> bool {
    if src.is_empty() {
        return false;
    }
    if is_video_host(src) {
        return true;
    }
    let host = get_domain_url(src);
    VIDEO_SCRIPT_HOSTS.iter().any(|d| host_matches(&host, d))
}

/// Remove inline `on*` handler attributes.
pub fn strip_event_handlers(doc: &Document) {
    for node in doc.select("*").nodes() {
        let el = Selection::from(*node);
        let handlers: Vec<String> = dom::get_all_attributes(&el)
            .into_keys()
            .filter(|name| name.len() > 2 && name.starts_with("on"))
            .collect();
        for name in &handlers {
            dom::remove_attribute(&el, name);
        }
    }
}

/// Resolve relative URLs against `base`.
///
/// Fragment-only and special-scheme values are left alone.
pub fn absolutize_urls(doc: &Document, base: &Url) -> usize {
    let mut rewritten = 0;
    for name in URL_ATTRIBUTES {
        for el in doc.select(&format!("[{name}]")).iter() {
            let value = attr(&el, name);
            let absolute = create_absolute_url(&value, base);
            if !absolute.is_empty() && absolute != value {
                dom::set_attribute(&el, name, &absolute);
                rewritten += 1;
            }
        }
    }
    for name in SRCSET_ATTRIBUTES {
        for el in doc.select(&format!("[{name}]")).iter() {
            let value = attr(&el, name);
            let absolute = absolutize_srcset(&value, base);
            if absolute != value {
                dom::set_attribute(&el, name, &absolute);
                rewritten += 1;
            }
        }
    }
    rewritten
}

/// Remove the bookkeeping attributes stamped during capture and survey.
pub fn strip_pipeline_attributes(doc: &Document) {
    for name in [KEY_ATTR, CURRENT_SRC_ATTR, LIVE_FLAGS_ATTR, SHADOW_HOST_ATTR, SHADOW_ROOT_ATTR] {
        doc.select(&format!("[{name}]")).remove_attr(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        match Url::parse("https://brand.example.com/collections/all") {
            Ok(u) => u,
            Err(e) => panic!("{e}"),
        }
    }

    #[test]
    fn test_vendor_chrome_is_removed() {
        let doc = dom::parse(
            r#"<body>
                <div id="onetrust-consent-sdk"><p>We value your privacy</p></div>
                <div class="gorgias-chat-launcher"></div>
                <div class="spinner"></div>
                <main><h1>Shop</h1></main>
            </body>"#,
        );
        let removed = remove_third_party_chrome(&doc);
        assert_eq!(removed, 3);
        assert!(doc.select("main h1").exists());
        assert!(!doc.select("#onetrust-consent-sdk").exists());
    }

    #[test]
    fn test_marked_elements_survive() {
        let doc = dom::parse(
            r#"<body>
                <div class="cart-drawer"><div data-pe-video="0">clip</div></div>
                <div class="cc-window">cookies</div>
            </body>"#,
        );
        assert_eq!(remove_third_party_chrome(&doc), 1);
        assert!(doc.select("[data-pe-video='0']").exists());
        assert!(doc.select(".cart-drawer").exists());
    }

    #[test]
    fn test_spared_wrapper_still_loses_nested_chrome() {
        let doc = dom::parse(
            r#"<body>
                <div id="tidio-chat">
                    <div data-pe-video="0">clip</div>
                    <div class="cc-window">cookies</div>
                </div>
            </body>"#,
        );
        assert_eq!(remove_third_party_chrome(&doc), 1);
        assert!(doc.select("#tidio-chat [data-pe-video='0']").exists());
        assert!(!doc.select(".cc-window").exists());
    }

    #[test]
    fn test_script_removal_spares_video_loaders() {
        let doc = dom::parse(
            r#"<head>
                <script src="/theme.js"></script>
                <script type="application/ld+json">{"@type":"Product"}</script>
                <link rel="modulepreload" href="/app.js">
            </head><body>
                <script>window.dataLayer = [];</script>
                <script src="https://fast.wistia.com/assets/external/E-v1.js"></script>
                <div data-pe-video="0"><script>var cfg = {}</script></div>
                <button onclick="track()">Go</button>
            </body>"#,
        );
        let report = sanitize(&doc, &base());
        assert_eq!(report.scripts_removed, 2);
        assert_eq!(doc.select("script").length(), 3);
        assert!(!doc.select("link[rel='modulepreload']").exists());
        assert!(!doc.select("button").has_attr("onclick"));
    }

    #[test]
    fn test_urls_are_absolutized() {
        let doc = dom::parse(
            r##"<body>
                <a id="rel" href="../products/tee">Tee</a>
                <a id="frag" href="#reviews">Reviews</a>
                <a id="mail" href="mailto:hi@brand.example.com">Mail</a>
                <img src="/img/a.jpg" srcset="/img/a.jpg 1x, /img/a@2x.jpg 2x" data-src="lazy.jpg">
                <video poster="/p.jpg"></video>
                <form action="/search"></form>
            </body>"##,
        );
        absolutize_urls(&doc, &base());

        assert_eq!(attr(&doc.select("#rel"), "href"), "https://brand.example.com/products/tee");
        assert_eq!(attr(&doc.select("#frag"), "href"), "#reviews");
        assert_eq!(attr(&doc.select("#mail"), "href"), "mailto:hi@brand.example.com");
        let img = doc.select("img");
        assert_eq!(attr(&img, "src"), "https://brand.example.com/img/a.jpg");
        assert_eq!(attr(&img, "data-src"), "https://brand.example.com/collections/lazy.jpg");
        assert!(attr(&img, "srcset").contains("https://brand.example.com/img/a@2x.jpg 2x"));
        assert_eq!(attr(&doc.select("video"), "poster"), "https://brand.example.com/p.jpg");
        assert_eq!(attr(&doc.select("form"), "action"), "https://brand.example.com/search");
    }

    #[test]
    fn test_pipeline_attributes_are_stripped() {
        let doc = dom::parse(
            r#"<div data-pe-key="k0" data-pe-shadow-host=""><template data-pe-shadow-root=""></template>
               <video data-pe-current-src="https://x/a.mp4" data-pe-flags="autoplay"></video></div>"#,
        );
        strip_pipeline_attributes(&doc);
        let html = doc.html().to_string();
        assert!(!html.contains("data-pe-"));
    }
}
