//! Product Card Resolver
//!
//! Two tiers. The platform selector list is tried first; the first selector
//! with at least one match wins and is recorded. When none matches, every
//! element whose class tokens look like a card fragment is clue-scored.
//!
//! Either way a card is kept only when its score reaches the threshold and it
//! holds at least one asset. Selector matches keep their outermost elements,
//! scan matches their innermost accepted elements.

use std::collections::{HashMap, HashSet};

use dom_query::{Document, NodeId, Selection};
use tracing::debug;
use url::Url;

use crate::dom;
use crate::patterns::{
    normalize_whitespace, truncate_chars, CARD_FRAGMENT_TOKEN, PRICE_TEXT, PRODUCT_KEYWORD, PRODUCT_PATH,
    PURCHASE_ACTION,
};
use crate::platform::{PlatformCategory, PlatformReport};
use crate::result::{Asset, AssetKind, Block, BlockType, CardClue, ProductCard};
use crate::selector::product::ProductSelectorTable;
use crate::selector::search::is_email_input;
use crate::selector::utils::{attr, descriptive_attrs, id_class, input_type, tag};
use crate::survey::{classify_element, snapshot_asset, KEY_ATTR, ROOT_KEY};
use crate::url_utils::create_absolute_url;

/// Cap on the card description.
const DESCRIPTION_CAP: usize = 300;

/// Result of product card resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductResolution {
    pub cards: Vec<ProductCard>,
    /// Selector that matched, `None` when the scan tier ran.
    pub selector: Option<String>,
    /// Candidates scored before filtering.
    pub candidates: usize,
}

/// Inputs shared by both tiers.
#[derive(Debug, Clone, Copy)]
pub struct CardScoring<'a> {
    pub base: &'a Url,
    pub threshold: u32,
    pub markup_cap: usize,
}

/// Whether the page shows a product grid worth resolving.
///
/// True for any `ProductGrid` block, for e-commerce platforms, and for three
/// or more groups sharing classnames that each hold an image (cards whose
/// own class made each one a separate group).
#[must_use]
pub fn has_grid_evidence(blocks: &[Block], assets: &[Asset], platform: &PlatformReport) -> bool {
    if blocks.iter().any(|b| b.block_type == BlockType::ProductGrid) {
        return true;
    }
    if platform.platform_category == Some(PlatformCategory::Ecommerce) {
        return true;
    }
    let mut repeated: HashMap<&str, usize> = HashMap::new();
    for block in blocks.iter().filter(|b| !b.classnames.trim().is_empty()) {
        let has_image = block
            .assets
            .iter()
            .filter_map(|&id| assets.get(id))
            .any(|a| a.kind == AssetKind::Image);
        if has_image {
            *repeated.entry(block.classnames.as_str()).or_default() += 1;
        }
    }
    repeated.values().any(|&n| n >= 3)
}

/// Resolve product cards document-wide.
#[must_use]
pub fn resolve_products(
    doc: &Document,
    platform: &str,
    table: &ProductSelectorTable,
    scoring: CardScoring,
) -> ProductResolution {
    for css in table.selectors_for(platform) {
        let matches = dom::try_select_all(doc, css);
        if matches.is_empty() {
            continue;
        }
        let candidates = dom::outermost(matches);
        let count = candidates.len();
        let cards: Vec<ProductCard> = candidates
            .iter()
            .map(|el| score_card(el, scoring))
            .filter(|card| accepted(card, scoring.threshold))
            .collect();
        debug!(selector = %css, candidates = count, cards = cards.len(), "product selector matched");
        return ProductResolution {
            cards,
            selector: Some(css.clone()),
            candidates: count,
        };
    }

    scan_products(doc, scoring)
}

/// Clue-scoring scan over class-fragment elements.
#[must_use]
pub fn scan_products(doc: &Document, scoring: CardScoring) -> ProductResolution {
    let candidates: Vec<Selection> = doc
        .select("body [class]")
        .iter()
        .filter(|el| dom::class_tokens(el).iter().any(|t| CARD_FRAGMENT_TOKEN.is_match(t)))
        .collect();
    let count = candidates.len();

    let scored: Vec<(Selection, ProductCard)> = candidates
        .into_iter()
        .map(|el| {
            let card = score_card(&el, scoring);
            (el, card)
        })
        .filter(|(_, card)| accepted(card, scoring.threshold))
        .collect();

    // Innermost: drop accepted elements that contain another accepted element.
    let mut containing: HashSet<NodeId> = HashSet::new();
    for (el, _) in &scored {
        for ancestor in dom::ancestors(el) {
            if let Some(id) = dom::node_id(&ancestor) {
                containing.insert(id);
            }
        }
    }
    let cards: Vec<ProductCard> = scored
        .into_iter()
        .filter(|(el, _)| dom::node_id(el).is_some_and(|id| !containing.contains(&id)))
        .map(|(_, card)| card)
        .collect();

    debug!(candidates = count, cards = cards.len(), "product scan complete");
    ProductResolution {
        cards,
        selector: None,
        candidates: count,
    }
}

fn accepted(card: &ProductCard, threshold: u32) -> bool {
    card.score >= threshold && !card.assets.is_empty()
}

/// Score one candidate element and extract its fields.
#[must_use]
pub fn score_card(el: &Selection, scoring: CardScoring) -> ProductCard {
    let mut clues = Vec::new();

    let links: Vec<Selection> = dom::select_with_self(el, "a[href]");
    let product_link = links.iter().find(|a| PRODUCT_PATH.is_match(&attr(a, "href")));
    if product_link.is_some() {
        clues.push(CardClue::ProductLink);
    }
    if has_purchase_action(el) {
        clues.push(CardClue::PurchaseAction);
    }

    let image = first_image(el);
    let heading = first_heading(el);
    let price = find_price(el);
    if image.is_some() && heading.is_some() && price.is_some() {
        clues.push(CardClue::ImageHeadingPrice);
    }
    if PRODUCT_KEYWORD.is_match(&id_class(el)) {
        clues.push(CardClue::KeywordClass);
    }

    let score = clues.iter().map(|c| c.points()).sum();
    let url = product_link
        .or_else(|| links.first())
        .and_then(|a| dom::non_empty_attribute(a, "href"))
        .map(|href| create_absolute_url(&href, scoring.base));
    let image_url = image
        .as_ref()
        .and_then(|img| dom::non_empty_attribute(img, "src").or_else(|| dom::non_empty_attribute(img, "data-src")))
        .map(|src| create_absolute_url(&src, scoring.base));
    let title = heading
        .map(|h| normalize_whitespace(&h.text()))
        .filter(|t| !t.is_empty())
        .or_else(|| image.as_ref().and_then(|img| dom::non_empty_attribute(img, "alt")));

    ProductCard {
        assets: card_assets(el, scoring.markup_cap),
        score,
        clues,
        title,
        price,
        url,
        image: image_url,
        description: find_description(el),
    }
}

fn has_purchase_action(el: &Selection) -> bool {
    let controls = dom::select_with_self(el, "button, input, a, [role='button']");
    let control_hit = controls.iter().any(|c| {
        if tag(c) == "input" && (is_email_input(c) || !matches!(input_type(c).as_str(), "submit" | "button" | "image")) {
            return false;
        }
        let desc = format!("{} {}", descriptive_attrs(c), normalize_whitespace(&c.text()));
        PURCHASE_ACTION.is_match(&desc)
    });
    control_hit
        || dom::select_with_self(el, "form")
            .iter()
            .any(|f| attr(f, "action").contains("/cart/add") || attr(f, "action").contains("add-to-cart"))
}

fn first_image<'a>(el: &Selection<'a>) -> Option<Selection<'a>> {
    dom::select_with_self(el, "img")
        .into_iter()
        .find(|img| classify_element(img, "img") == Some(AssetKind::Image))
}

fn first_heading<'a>(el: &Selection<'a>) -> Option<Selection<'a>> {
    dom::select_with_self(el, "h1, h2, h3, h4, h5, h6, [itemprop='name']")
        .into_iter()
        .next()
        .or_else(|| {
            dom::select_with_self(el, "[class]").into_iter().find(|c| {
                dom::class_tokens(c).iter().any(|t| {
                    let t = t.to_lowercase();
                    t.ends_with("title") || t.ends_with("__name") || t == "product-name"
                })
            })
        })
}

fn find_price(el: &Selection) -> Option<String> {
    let marked = dom::select_with_self(el, "[itemprop='price'], [class*='price']");
    for candidate in &marked {
        let text = normalize_whitespace(&candidate.text());
        if let Some(m) = PRICE_TEXT.find(&text) {
            return Some(m.as_str().trim().to_string());
        }
        if let Some(content) = dom::non_empty_attribute(candidate, "content") {
            return Some(content);
        }
    }
    PRICE_TEXT
        .find(&normalize_whitespace(&el.text()))
        .map(|m| m.as_str().trim().to_string())
}

fn find_description(el: &Selection) -> Option<String> {
    dom::select_with_self(el, "[class*='description'], [itemprop='description'], p")
        .iter()
        .map(|d| normalize_whitespace(&d.text()))
        .find(|t| !t.is_empty() && (t.len() > 40 || !PRICE_TEXT.is_match(t)))
        .map(|t| truncate_chars(&t, DESCRIPTION_CAP))
}

fn card_assets(el: &Selection, markup_cap: usize) -> Vec<Asset> {
    let parent_key = dom::non_empty_attribute(el, KEY_ATTR).unwrap_or_else(|| ROOT_KEY.to_string());
    let classnames = attr(el, "class");
    let mut assets = Vec::new();
    for child in el.select("*").iter() {
        let Some(kind) = classify_element(&child, &tag(&child)) else {
            continue;
        };
        if kind == AssetKind::Input && is_email_input(&child) {
            continue;
        }
        assets.push(snapshot_asset(&child, kind, assets.len(), parent_key.clone(), classnames.clone(), markup_cap));
    }
    assets
}
