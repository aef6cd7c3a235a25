//! Compiled regex patterns shared by the classifiers.
//!
//! All patterns are compiled once using `LazyLock`. Patterns are organized by
//! the pipeline stage that consumes them.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Video Source Patterns
// =============================================================================

/// Direct media file URLs (mp4, webm, m3u8, mov, ogv, m4v).
pub static MEDIA_FILE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'<>()\\]+?\.(?:mp4|webm|m3u8|mov|ogv|m4v)(?:\?[^\s"'<>()\\]*)?"#)
        .expect("MEDIA_FILE_URL regex")
});

/// YouTube watch/embed/short URLs. Group 1 is the 11-character video id.
pub static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:youtube(?:-nocookie)?\.com/(?:embed/|watch\?(?:[^\s\x22']*&)?v=|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .expect("YOUTUBE_URL regex")
});

/// Vimeo page or player URLs. Group 1 is the numeric video id.
pub static VIMEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:player\.)?vimeo\.com/(?:video/|channels/[^/\s]+/)?(\d{6,12})")
        .expect("VIMEO_URL regex")
});

/// Wistia media/embed URLs and `wvideo=` parameters. Group 1 is the hashed id.
pub static WISTIA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:wistia\.(?:com|net)/(?:medias|embed/iframe|embed/medias)/|wvideo=)([a-z0-9]{10})")
        .expect("WISTIA_URL regex")
});

/// Thumbnail URLs inside JSON configuration blobs.
pub static JSON_THUMBNAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"(?:thumbnail_?url|thumbnail|poster(?:_?url)?|preview_?image)"\s*:\s*"(https?://[^"]+)""#)
        .expect("JSON_THUMBNAIL regex")
});

/// Bare YouTube id shape.
pub static YOUTUBE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("YOUTUBE_ID regex"));

/// Bare Vimeo id shape.
pub static VIMEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6,12}$").expect("VIMEO_ID regex"));

/// Bare Wistia id shape.
pub static WISTIA_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]{10}$").expect("WISTIA_ID regex"));

// =============================================================================
// Search / Email Vocabulary
// =============================================================================

/// Attribute vocabulary marking an input as a search box.
pub static SEARCH_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(search|recherche|suche|buscar|\bfind\b|\bq\b|query|keyword|look\s*up)")
        .expect("SEARCH_VOCABULARY regex")
});

/// Vocabulary that excludes an input from search classification.
pub static EMAIL_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(e-?mail|newsletter|subscri|sign[\s_-]?up|mailing|klaviyo|your\s+inbox)")
        .expect("EMAIL_VOCABULARY regex")
});

/// Live chat vendors, matched as whole tokens of an id, class or URL.
pub static CHAT_VENDOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z0-9])(?:intercom|drift|tidio|zendesk|crisp|livechat(?:inc)?|gorgias|tawk(?:chat)?|zopim)(?:[^a-z0-9]|$)",
    )
    .expect("CHAT_VENDOR regex")
});

// =============================================================================
// Block / Product Vocabulary
// =============================================================================

/// Classnames that raise confidence in a Hero block.
pub static HERO_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(hero|banner|\bmain\b|masthead|jumbotron|splash|slideshow)").expect("HERO_CLASS regex")
});

/// Anchor paths that look like product detail or cart links.
pub static PRODUCT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(/products?/|/items?/|/p/|/dp/|/shop/|/detail|/sku/|/cart|add-to-cart|[?&](?:product_id|add-to-cart|variant)=)")
        .expect("PRODUCT_PATH regex")
});

/// Text or attribute vocabulary of purchase controls.
pub static PURCHASE_ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(add[\s_-]*to[\s_-]*(cart|bag|basket)|buy[\s_-]*(it[\s_-]*)?now|\bbuy\b|purchase|order[\s_-]*now|shop[\s_-]*now|quick[\s_-]*add|in[\s_-]*den[\s_-]*warenkorb|ajouter\s+au\s+panier)")
        .expect("PURCHASE_ACTION regex")
});

/// Price text: currency symbol or code next to a number.
pub static PRICE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([$€£¥₹]\s?\d[\d.,]*|\d[\d.,]*\s?(?:€|usd|eur|gbp|kr|zł))")
        .expect("PRICE_TEXT regex")
});

/// Class/id keywords awarding the keyword clue.
pub static PRODUCT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(product|\bsku\b|merch|\boffer\b|\bgoods\b)").expect("PRODUCT_KEYWORD regex")
});

/// One class token shaped like a generic card fragment.
///
/// Matches `card`, `product-card`, `grid__item`, `tile--wide`, but not
/// sub-parts such as `card__image` or plural wrappers such as `cards-grid`.
pub static CARD_FRAGMENT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9]+[-_]+)*(?:product-card|card|item|tile|sku|listing)(?:--[a-z0-9-]+)?$")
        .expect("CARD_FRAGMENT_TOKEN regex")
});

// =============================================================================
// Text Cleaning Patterns
// =============================================================================

/// Matches multiple whitespace characters for normalization.
pub static WHITESPACE_NORMALIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_NORMALIZE regex"));

/// Slug accepted as a file basename.
pub static SAFE_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("SAFE_SLUG regex"));

/// Collapse whitespace and trim.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_NORMALIZE.replace_all(text, " ").trim().to_string()
}

/// Truncate to at most `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
