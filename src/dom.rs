//! DOM Operations Adapter
//!
//! Thin helpers over the `dom_query` crate. Every stage after the capture works
//! on a `Document` parsed from the browser snapshot, so the survey, resolver,
//! sanitizer and reconstructor share one vocabulary for attribute access,
//! ancestry checks and markup edits.

use std::collections::{BTreeMap, HashSet};

// Re-export core types for external use
pub use dom_query::{Document, NodeId, Selection};

pub use tendril::StrTendril;

// === Attribute Operations ===

/// Get element ID attribute
#[inline]
#[must_use]
pub fn id(sel: &Selection) -> Option<String> {
    sel.attr("id").map(|s| s.to_string())
}

/// Get element class attribute
#[inline]
#[must_use]
pub fn class_name(sel: &Selection) -> Option<String> {
    sel.attr("class").map(|s| s.to_string())
}

/// Get any attribute value
#[inline]
#[must_use]
pub fn get_attribute(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name).map(|s| s.to_string())
}

/// Get a trimmed, non-empty attribute value
#[must_use]
pub fn non_empty_attribute(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Set an attribute value
#[inline]
pub fn set_attribute(sel: &Selection, name: &str, value: &str) {
    sel.set_attr(name, value);
}

/// Remove an attribute
#[inline]
pub fn remove_attribute(sel: &Selection, name: &str) {
    sel.remove_attr(name);
}

/// Get all attributes as an ordered map
///
/// Returns an empty map if the selection is empty.
#[must_use]
pub fn get_all_attributes(sel: &Selection) -> BTreeMap<String, String> {
    sel.nodes()
        .first()
        .map(|node| {
            node.attrs()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Whitespace-separated class tokens
#[must_use]
pub fn class_tokens(sel: &Selection) -> Vec<String> {
    class_name(sel)
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

// === Tag/Node Information ===

/// Get tag name (lowercase)
#[must_use]
pub fn tag_name(sel: &Selection) -> Option<String> {
    sel.nodes()
        .first()
        .and_then(dom_query::NodeRef::node_name)
        .map(|t| t.to_ascii_lowercase())
}

/// Node identity of the first element in the selection
#[must_use]
pub fn node_id(sel: &Selection) -> Option<NodeId> {
    sel.nodes().first().map(|n| n.id)
}

// === Text Content ===

/// Get outer HTML content
#[inline]
#[must_use]
pub fn outer_html(sel: &Selection) -> StrTendril {
    sel.html()
}

// === Tree Navigation ===

/// Element ancestors, nearest first
///
/// Stops at the document node, which carries no tag name.
#[must_use]
pub fn ancestors<'a>(sel: &Selection<'a>) -> Vec<Selection<'a>> {
    let mut found = Vec::new();
    let mut current = sel.parent();
    while current.exists() && tag_name(&current).is_some() {
        found.push(current.clone());
        current = current.parent();
    }
    found
}

/// Whether any ancestor satisfies `rule`
#[must_use]
pub fn has_ancestor(sel: &Selection, rule: impl Fn(&Selection) -> bool) -> bool {
    ancestors(sel).iter().any(|a| rule(a))
}

/// Whether any ancestor's node id is in `ids`
#[must_use]
pub fn has_ancestor_in(sel: &Selection, ids: &HashSet<NodeId>) -> bool {
    ancestors(sel)
        .iter()
        .filter_map(node_id)
        .any(|id| ids.contains(&id))
}

/// Elements matching `selector` inside `root`, root included
#[must_use]
pub fn select_with_self<'a>(root: &Selection<'a>, selector: &str) -> Vec<Selection<'a>> {
    let mut found = Vec::new();
    if root.is(selector) {
        found.push(root.clone());
    }
    found.extend(root.select(selector).iter());
    found
}

/// Elements of `doc` matching a configurable selector
///
/// An unparsable selector matches nothing instead of panicking.
#[must_use]
pub fn try_select_all<'a>(doc: &'a Document, selector: &str) -> Vec<Selection<'a>> {
    if selector.trim().is_empty() {
        return Vec::new();
    }
    doc.try_select(selector)
        .map(|sel| sel.iter().collect())
        .unwrap_or_default()
}

/// Descendants of `root` matching a configurable selector
#[must_use]
pub fn try_select_within<'a>(root: &Selection<'a>, selector: &str) -> Vec<Selection<'a>> {
    if selector.trim().is_empty() {
        return Vec::new();
    }
    root.try_select(selector)
        .map(|sel| sel.iter().collect())
        .unwrap_or_default()
}

/// Keep only selections with no ancestor in the same list
#[must_use]
pub fn outermost<'a>(sels: Vec<Selection<'a>>) -> Vec<Selection<'a>> {
    let ids: HashSet<NodeId> = sels.iter().filter_map(node_id).collect();
    sels.into_iter().filter(|s| !has_ancestor_in(s, &ids)).collect()
}

// === Tree Manipulation ===

/// Remove elements from tree
#[inline]
pub fn remove(sel: &Selection) {
    sel.remove();
}

/// Append HTML content
#[inline]
pub fn append_html(sel: &Selection, html: &str) {
    sel.append_html(html);
}

/// Replace element with HTML
#[inline]
pub fn replace_with_html(sel: &Selection, html: &str) {
    sel.replace_with_html(html);
}

// === Parsing ===

/// Parse HTML string into document
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

/// Minimal HTML escaping for text and attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
