//! Utility functions for selector pattern matching
//!
//! Helpers used throughout selector rules: attribute access that never fails,
//! lower-cased attribute bundles for vocabulary checks, and tag tests.

use crate::dom;
use dom_query::Selection;

// === Element Attribute Helpers ===

/// Get element ID attribute (empty string if missing)
#[inline]
#[must_use]
pub fn id(sel: &Selection) -> String {
    dom::id(sel).unwrap_or_default()
}

/// Get element class attribute (empty string if missing)
#[inline]
#[must_use]
pub fn class(sel: &Selection) -> String {
    dom::class_name(sel).unwrap_or_default()
}

/// Get any attribute (empty string if missing)
#[inline]
#[must_use]
pub fn attr(sel: &Selection, name: &str) -> String {
    dom::get_attribute(sel, name).unwrap_or_default()
}

/// Get tag name (empty string if missing)
#[inline]
#[must_use]
pub fn tag(sel: &Selection) -> String {
    dom::tag_name(sel).unwrap_or_default()
}

/// Lower-cased `id class` for vocabulary checks
///
/// # Example
///
/// ```rust
/// use page_replica::selector::utils;
/// use page_replica::dom;
///
/// let doc = dom::parse(r#"<div id="Main" class="Hero-Banner">text</div>"#);
/// let div = doc.select("div");
///
/// assert_eq!(utils::id_class(&div), "main hero-banner");
/// ```
#[must_use]
pub fn id_class(sel: &Selection) -> String {
    format!("{} {}", id(sel), class(sel)).trim().to_lowercase()
}

/// Lower-cased bundle of the attributes that describe a form control
///
/// Covers name, id, class, placeholder, aria-label, title, type, autocomplete
/// and value, joined by spaces.
#[must_use]
pub fn descriptive_attrs(sel: &Selection) -> String {
    const NAMES: &[&str] = &[
        "name",
        "id",
        "class",
        "placeholder",
        "aria-label",
        "title",
        "type",
        "autocomplete",
        "value",
        "role",
    ];
    NAMES
        .iter()
        .filter_map(|n| dom::get_attribute(sel, n))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// === Element Type Checks ===

/// Check if element is one of the specified tags
///
/// # Example
///
/// ```rust
/// use page_replica::selector::utils;
/// use page_replica::dom;
///
/// let doc = dom::parse("<button>Go</button>");
/// let button = doc.select("button");
///
/// assert!(utils::is_one_of_tags(&button, &["button", "a"]));
/// assert!(!utils::is_one_of_tags(&button, &["input", "img"]));
/// ```
#[inline]
#[must_use]
pub fn is_one_of_tags(sel: &Selection, tags: &[&str]) -> bool {
    let t = tag(sel);
    tags.contains(&t.as_str())
}

/// Lower-cased `type` of an input, `text` when absent
#[must_use]
pub fn input_type(sel: &Selection) -> String {
    let t = attr(sel, "type").trim().to_lowercase();
    if t.is_empty() {
        "text".to_string()
    } else {
        t
    }
}
