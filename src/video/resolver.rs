//! Video/Widget Resolver
//!
//! Per widget container, in priority order:
//!
//! 1. nested slides are resolved individually; a slide with a source URL is
//!    tagged and emitted as `keen-slide`, and the container itself is then
//!    left unmarked
//! 2. otherwise the whole container is searched and emitted as `widget`,
//!    even with no sources, so reconstruction can show a diagnostic
//! 3. the tagged element stays in place; nothing is removed here
//!
//! Native `<video>` elements and host iframes outside every widget are then
//! resolved as their own records.

use std::collections::HashSet;

use dom_query::{Document, NodeId, Selection};
use tracing::debug;
use url::Url;

use crate::dom;
use crate::patterns::truncate_chars;
use crate::result::{VideoKind, VideoRecord};
use crate::selector::utils::{attr, id_class, tag};
use crate::video::sources::{classify_url, discover, has_video_evidence, is_video_host, Discovery};
use crate::video::MARKER_ATTR;

/// Third-party widget mounts searched for videos.
const DEFAULT_WIDGETS: &[&str] = &[
    ".yotpo-video-carousel",
    ".yotpo-main-widget",
    ".okeReviews",
    ".junip-product-reviews",
    "#looxReviews",
    "[class*='tolstoy']",
    "[class*='videowise']",
    "[class*='shoppable-video']",
    "[class*='video-carousel']",
    "[class*='video-slider']",
    ".keen-slider",
    ".swiper",
    ".slick-slider",
    ".splide",
    "[data-pe-shadow-host]",
];

/// Slide/card elements inside a widget.
const DEFAULT_SLIDES: &[&str] = &[
    ".keen-slider__slide",
    ".swiper-slide",
    ".slick-slide",
    ".splide__slide",
    ".glide__slide",
    ".carousel-item",
    "[class*='video-card']",
    "[class*='__slide']",
];

/// Immutable widget and slide selector lists.
#[derive(Debug, Clone)]
pub struct WidgetTable {
    pub widgets: Vec<String>,
    pub slides: Vec<String>,
}

impl Default for WidgetTable {
    fn default() -> Self {
        Self {
            widgets: DEFAULT_WIDGETS.iter().map(|s| (*s).to_string()).collect(),
            slides: DEFAULT_SLIDES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

struct Resolver<'u> {
    base: &'u Url,
    sample_cap: usize,
    records: Vec<VideoRecord>,
}

impl Resolver<'_> {
    fn emit(&mut self, el: &Selection, kind: VideoKind, found: Discovery) {
        let index = self.records.len();
        let markup_sample = truncate_chars(&dom::outer_html(el), self.sample_cap);
        dom::set_attribute(el, MARKER_ATTR, &index.to_string());
        self.records.push(VideoRecord {
            index,
            kind,
            source_urls: found.urls,
            thumbnail_url: found.thumbnail,
            title: found.title,
            dimensions: found.dimensions,
            flags: found.flags,
            markup_sample,
        });
    }

    fn resolve_widget(&mut self, container: &Selection, slides: &str) {
        let mut slide_resolved = false;
        for slide in dom::outermost(dom::try_select_within(container, slides)) {
            let found = discover(&slide, self.base);
            if !found.urls.is_empty() {
                self.emit(&slide, VideoKind::KeenSlide, found);
                slide_resolved = true;
            }
        }
        if slide_resolved {
            return;
        }

        let found = discover(container, self.base);
        if found.urls.is_empty() && dom::outer_html(container).trim().is_empty() {
            return;
        }
        self.emit(container, VideoKind::Widget, found);
    }

    fn resolve_standalone(&mut self, el: &Selection) {
        let found = discover(el, self.base);
        let kind = if tag(el) == "iframe" {
            found
                .urls
                .first()
                .and_then(|u| classify_url(u).host_kind())
                .unwrap_or(VideoKind::Widget)
        } else {
            VideoKind::Html5
        };
        self.emit(el, kind, found);
    }
}

/// Widget containers that may hold video content.
fn qualifies(container: &Selection) -> bool {
    let desc = id_class(container);
    has_video_evidence(container) || desc.contains("video") || desc.contains("tolstoy") || desc.contains("videowise")
}

/// Tag every video-bearing element and return one record per marker.
///
/// Indices start at 0 and follow the order markers were written. Markers
/// left over from an earlier pass are cleared first.
pub fn resolve_videos(doc: &Document, base: &Url, table: &WidgetTable, sample_cap: usize) -> Vec<VideoRecord> {
    doc.select(&format!("[{MARKER_ATTR}]")).remove_attr(MARKER_ATTR);

    let mut resolver = Resolver {
        base,
        sample_cap,
        records: Vec::new(),
    };

    let widget_css = table.widgets.join(", ");
    let slide_css = table.slides.join(", ");

    let candidates: Vec<Selection> = dom::try_select_all(doc, &widget_css)
        .into_iter()
        .filter(qualifies)
        .collect();
    let containers = dom::outermost(candidates);
    let container_ids: HashSet<NodeId> = containers.iter().filter_map(dom::node_id).collect();

    for container in &containers {
        resolver.resolve_widget(container, &slide_css);
    }
    let widget_records = resolver.records.len();

    for el in doc.select("video, iframe").iter() {
        if tag(&el) == "iframe" && !is_video_host(&attr(&el, "src")) && !is_video_host(&attr(&el, "data-src")) {
            continue;
        }
        let inside_widget = dom::node_id(&el).is_some_and(|id| container_ids.contains(&id))
            || dom::has_ancestor_in(&el, &container_ids);
        if inside_widget || el.has_attr(MARKER_ATTR) || dom::has_ancestor(&el, |a| a.has_attr(MARKER_ATTR)) {
            continue;
        }
        resolver.resolve_standalone(&el);
    }

    debug!(
        widgets = containers.len(),
        widget_records,
        standalone = resolver.records.len() - widget_records,
        "videos resolved"
    );
    resolver.records
}
