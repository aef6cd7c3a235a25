//! Content Surveyor
//!
//! One pass over the captured document. Every element is visited once and
//! classified into at most one asset kind; raw collections (native videos,
//! carousels, forms, buttons) are gathered in the same walk.
//!
//! The nearest ancestor carrying an id or class is the asset's parent key.
//! That ancestor is stamped with `data-pe-key` so later stages can find the
//! group again; the stamp is stripped before output.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use dom_query::{Document, NodeId, Selection};
use tracing::debug;

use crate::dom;
use crate::patterns::{normalize_whitespace, truncate_chars};
use crate::result::{Asset, AssetKind, FormSummary, RawCollections};
use crate::selector::search::{enclosing_form, is_email_input, is_search_container, SEARCH_PARTS};
use crate::selector::utils::{attr, class, input_type, is_one_of_tags, tag};
use crate::selector::{matches_any, search};
use crate::video::sources::is_video_host;

/// Attribute stamped on parent-key ancestors.
pub const KEY_ATTR: &str = "data-pe-key";

/// Parent key of assets with no id/class ancestor.
pub const ROOT_KEY: &str = "root";

/// Attributes copied into each asset snapshot.
const KEPT_ATTRIBUTES: &[&str] = &[
    "id", "class", "name", "type", "href", "src", "alt", "placeholder", "aria-label", "title",
    "value", "action", "method", "poster", "role", "data-src", "width", "height",
];

/// Cap on the normalized text kept per asset.
const TEXT_CAP: usize = 200;

/// Output of the survey pass.
#[derive(Debug, Clone, Default)]
pub struct SurveyReport {
    /// Assets in document order; `assets[i].id == i`.
    pub assets: Vec<Asset>,
    pub collections: RawCollections,
    /// Ids of assets that make up a search box.
    pub search_assets: BTreeSet<usize>,
    /// Ids of inputs identified as email/newsletter fields.
    pub email_assets: BTreeSet<usize>,
}

/// Walk the document and snapshot its assets.
#[must_use]
pub fn survey(doc: &Document, markup_cap: usize) -> SurveyReport {
    let mut report = SurveyReport::default();
    let mut keys: HashMap<NodeId, String> = HashMap::new();
    let mut carousel_ids: HashSet<NodeId> = HashSet::new();

    for el in doc.select("body *").iter() {
        let tag_name = tag(&el);
        if matches!(tag_name.as_str(), "script" | "style" | "noscript" | "template" | "head" | "meta" | "link") {
            continue;
        }
        if dom::has_ancestor(&el, |a| tag(a) == "svg") {
            continue;
        }

        collect_raw(&el, &tag_name, markup_cap, &mut carousel_ids, &mut report.collections);

        let Some(kind) = classify_element(&el, &tag_name) else {
            continue;
        };

        let (parent_key, classnames) = parent_key(&el, &mut keys);
        let id = report.assets.len();

        if kind == AssetKind::Button {
            report.collections.buttons.push(truncate_chars(&dom::outer_html(&el), markup_cap));
        }
        if kind == AssetKind::Input && is_email_input(&el) {
            report.email_assets.insert(id);
        } else if is_search_part(&el) {
            report.search_assets.insert(id);
        }

        report.assets.push(snapshot_asset(&el, kind, id, parent_key, classnames, markup_cap));
    }

    debug!(
        assets = report.assets.len(),
        search = report.search_assets.len(),
        email = report.email_assets.len(),
        "survey complete"
    );
    report
}

/// Asset kind of one element, in priority order.
#[must_use]
pub fn classify_element(el: &Selection, tag_name: &str) -> Option<AssetKind> {
    match tag_name {
        "input" => match input_type(el).as_str() {
            "hidden" => None,
            "submit" | "button" | "image" | "reset" => Some(AssetKind::Button),
            _ => Some(AssetKind::Input),
        },
        "textarea" | "select" => Some(AssetKind::Input),
        "button" => Some(AssetKind::Button),
        "video" => Some(AssetKind::Video),
        "iframe" if is_video_host(&attr(el, "src")) => Some(AssetKind::Video),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(AssetKind::Heading),
        "svg" => Some(AssetKind::Icon),
        "img" if is_icon_image(el) => Some(AssetKind::Icon),
        "img" => Some(AssetKind::Image),
        "i" | "span" if is_icon_glyph(el) => Some(AssetKind::Icon),
        "a" if is_button_like(el) => Some(AssetKind::Button),
        "a" if el.has_attr("href") => Some(AssetKind::Link),
        _ if attr(el, "role").eq_ignore_ascii_case("button") => Some(AssetKind::Button),
        _ => None,
    }
}

fn is_button_like(el: &Selection) -> bool {
    attr(el, "role").eq_ignore_ascii_case("button")
        || dom::class_tokens(el).iter().any(|t| {
            let t = t.to_lowercase();
            t == "btn" || t.starts_with("btn-") || t.starts_with("btn_") || t.contains("button")
        })
}

fn is_icon_image(el: &Selection) -> bool {
    let small = |name: &str| attr(el, name).trim_end_matches("px").parse::<u32>().is_ok_and(|v| v <= 48);
    let desc = format!("{} {} {}", class(el), attr(el, "alt"), attr(el, "src")).to_lowercase();
    (small("width") && small("height")) || desc.contains("icon")
}

fn is_icon_glyph(el: &Selection) -> bool {
    if !el.text().trim().is_empty() {
        return false;
    }
    dom::class_tokens(el).iter().any(|t| {
        let t = t.to_lowercase();
        t.contains("icon") || t == "fa" || t.starts_with("fa-") || t.starts_with("material-")
    })
}

fn is_search_part(el: &Selection) -> bool {
    if search::is_search_input(el) {
        return true;
    }
    if !matches_any(el, SEARCH_PARTS) {
        return false;
    }
    dom::has_ancestor(el, is_search_container)
        || enclosing_form(el).is_some_and(|form| form.select("input").iter().any(|i| search::is_search_input(&i)))
}

fn parent_key(el: &Selection, keys: &mut HashMap<NodeId, String>) -> (String, String) {
    let keyed = dom::ancestors(el).into_iter().find(|a| {
        !is_one_of_tags(a, &["html"])
            && (dom::non_empty_attribute(a, "id").is_some() || dom::non_empty_attribute(a, "class").is_some())
    });
    let Some(ancestor) = keyed else {
        return (ROOT_KEY.to_string(), String::new());
    };
    let Some(node) = dom::node_id(&ancestor) else {
        return (ROOT_KEY.to_string(), String::new());
    };
    let next = keys.len();
    let key = keys
        .entry(node)
        .or_insert_with(|| {
            let key = format!("k{next}");
            dom::set_attribute(&ancestor, KEY_ATTR, &key);
            key
        })
        .clone();
    (key, class(&ancestor))
}

/// Immutable snapshot of one element.
#[must_use]
pub fn snapshot_asset(
    el: &Selection,
    kind: AssetKind,
    id: usize,
    parent_key: String,
    classnames: String,
    markup_cap: usize,
) -> Asset {
    Asset {
        id,
        kind,
        tag: tag(el),
        attributes: kept_attributes(el),
        text: asset_text(el, kind),
        markup: truncate_chars(&dom::outer_html(el), markup_cap),
        parent_key,
        classnames,
    }
}

fn kept_attributes(el: &Selection) -> BTreeMap<String, String> {
    dom::get_all_attributes(el)
        .into_iter()
        .filter(|(name, _)| KEPT_ATTRIBUTES.contains(&name.as_str()))
        .collect()
}

fn asset_text(el: &Selection, kind: AssetKind) -> String {
    let raw = match kind {
        AssetKind::Image | AssetKind::Icon => attr(el, "alt"),
        AssetKind::Input => {
            let placeholder = attr(el, "placeholder");
            if placeholder.is_empty() {
                attr(el, "aria-label")
            } else {
                placeholder
            }
        }
        _ => {
            let text = el.text().to_string();
            if text.trim().is_empty() {
                attr(el, "aria-label")
            } else {
                text
            }
        }
    };
    truncate_chars(&normalize_whitespace(&raw), TEXT_CAP)
}

fn collect_raw(
    el: &Selection,
    tag_name: &str,
    markup_cap: usize,
    carousel_ids: &mut HashSet<NodeId>,
    collections: &mut RawCollections,
) {
    match tag_name {
        "video" => collections.videos.push(truncate_chars(&dom::outer_html(el), markup_cap)),
        "form" => collections.forms.push(FormSummary {
            action: dom::non_empty_attribute(el, "action"),
            method: dom::non_empty_attribute(el, "method")
                .map_or_else(|| "get".to_string(), |m| m.to_lowercase()),
            inputs: el.select("input, textarea, select").length(),
            buttons: el.select("button, input[type='submit']").length(),
        }),
        _ => {}
    }
    if is_carousel(el) {
        let inside_known = dom::ancestors(el)
            .iter()
            .filter_map(dom::node_id)
            .any(|id| carousel_ids.contains(&id));
        if let Some(id) = dom::node_id(el) {
            carousel_ids.insert(id);
        }
        if !inside_known {
            collections.carousels.push(truncate_chars(&dom::outer_html(el), markup_cap));
        }
    }
}

/// Carousel/slider container
#[must_use]
pub fn is_carousel(el: &Selection) -> bool {
    dom::class_tokens(el).iter().any(|t| {
        let t = t.to_lowercase();
        matches!(
            t.as_str(),
            "carousel" | "slider" | "swiper" | "swiper-container" | "slick-slider" | "keen-slider" | "splide" | "flickity-enabled" | "glide"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <section class="hero banner">
            <h1>Big sale</h1>
            <img src="/hero.jpg" alt="Hero shot">
            <a class="btn btn-primary" href="/shop">Shop now</a>
        </section>
        <div>
            <p><a href="/about">About</a></p>
        </div>
        <form class="site-search" action="/search">
            <input type="search" name="q" placeholder="Search">
            <button type="submit" aria-label="Search"><svg class="icon-search"><path d="M0"/></svg></button>
        </form>
        <form class="newsletter">
            <input type="email" placeholder="Your email">
            <button type="submit">Subscribe</button>
        </form>
        <video src="/clip.mp4"></video>
        <div class="swiper"><div class="swiper"><div>slide</div></div></div>
    </body></html>"#;

    fn run() -> (Document, SurveyReport) {
        let doc = dom::parse(PAGE);
        let report = survey(&doc, 300);
        (doc, report)
    }

    #[test]
    fn test_assets_in_document_order_with_ids() {
        let (_, report) = run();
        for (i, asset) in report.assets.iter().enumerate() {
            assert_eq!(asset.id, i);
        }
        let kinds: Vec<AssetKind> = report.assets.iter().take(3).map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AssetKind::Heading, AssetKind::Image, AssetKind::Button]);
    }

    #[test]
    fn test_parent_keys_are_stamped() {
        let (doc, report) = run();
        let heading = &report.assets[0];
        assert_eq!(heading.classnames, "hero banner");
        assert_eq!(
            dom::get_attribute(&doc.select("section"), KEY_ATTR).as_deref(),
            Some(heading.parent_key.as_str())
        );
        assert_eq!(report.assets[1].parent_key, heading.parent_key);
    }

    #[test]
    fn test_root_key_without_keyed_ancestor() {
        let (_, report) = run();
        let about = report.assets.iter().find(|a| a.text == "About");
        assert_eq!(about.map(|a| a.parent_key.as_str()), Some(ROOT_KEY));
    }

    #[test]
    fn test_search_and_email_partition() {
        let (_, report) = run();
        let search_kinds: Vec<AssetKind> = report.search_assets.iter().map(|&i| report.assets[i].kind).collect();
        assert_eq!(search_kinds, vec![AssetKind::Input, AssetKind::Button, AssetKind::Icon]);

        assert_eq!(report.email_assets.len(), 1);
        let email = report.email_assets.iter().next().map(|&i| &report.assets[i]);
        assert_eq!(email.map(|a| a.attr("type")), Some("email"));
        assert!(report.search_assets.is_disjoint(&report.email_assets));
    }

    #[test]
    fn test_svg_children_are_not_assets() {
        let (_, report) = run();
        assert!(report.assets.iter().all(|a| a.tag != "path"));
        assert!(report.assets.iter().any(|a| a.kind == AssetKind::Icon));
    }

    #[test]
    fn test_raw_collections() {
        let (_, report) = run();
        assert_eq!(report.collections.videos.len(), 1);
        assert_eq!(report.collections.carousels.len(), 1);
        assert_eq!(report.collections.forms.len(), 2);
        assert_eq!(report.collections.forms[0].action.as_deref(), Some("/search"));
        assert_eq!(report.collections.buttons.len(), 3);
    }

    #[test]
    fn test_markup_is_truncated() {
        let doc = dom::parse(&format!(r#"<body><div class="x"><h2>{}</h2></div></body>"#, "a".repeat(1000)));
        let report = survey(&doc, 300);
        assert_eq!(report.assets[0].markup.chars().count(), 300);
        assert_eq!(report.assets[0].text.chars().count(), TEXT_CAP);
    }
}
