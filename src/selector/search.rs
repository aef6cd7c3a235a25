//! Search Box Rules
//!
//! Identify search inputs, their submit controls and icons, and the
//! containers that hold them. Email/newsletter inputs are excluded first:
//! an input that looks like a subscription field is never a search box, no
//! matter what else it says.

use dom_query::Selection;

use crate::dom;
use crate::patterns::{EMAIL_VOCABULARY, SEARCH_VOCABULARY};
use crate::selector::utils::{attr, descriptive_attrs, id_class, input_type, is_one_of_tags, tag};
use crate::selector::Rule;

/// Input types that can never hold a search query.
const NON_TEXT_TYPES: &[&str] = &[
    "hidden", "submit", "button", "image", "reset", "checkbox", "radio", "file", "password",
    "number", "range", "color", "date", "datetime-local", "month", "week", "time", "tel", "url",
];

/// Containers that may wrap a search box.
const CONTAINER_TAGS: &[&str] = &["form", "div", "section", "header", "nav", "li", "span", "search"];

/// Nearest enclosing `<form>`, if any
#[must_use]
pub fn enclosing_form<'a>(sel: &Selection<'a>) -> Option<Selection<'a>> {
    dom::ancestors(sel).into_iter().find(|a| tag(a) == "form")
}

/// Input that must be treated as email/newsletter/subscribe
#[must_use]
pub fn is_email_input(sel: &Selection) -> bool {
    if !is_one_of_tags(sel, &["input", "textarea"]) {
        return false;
    }
    if input_type(sel) == "email" {
        return true;
    }
    if EMAIL_VOCABULARY.is_match(&descriptive_attrs(sel)) {
        return true;
    }
    enclosing_form(sel).is_some_and(|form| {
        let form_desc = format!("{} {}", id_class(&form), attr(&form, "action").to_lowercase());
        EMAIL_VOCABULARY.is_match(&form_desc) && !SEARCH_VOCABULARY.is_match(&form_desc)
    })
}

/// Input that accepts a search query
#[must_use]
pub fn is_search_input(sel: &Selection) -> bool {
    if tag(sel) != "input" || is_email_input(sel) {
        return false;
    }
    let kind = input_type(sel);
    if NON_TEXT_TYPES.contains(&kind.as_str()) {
        return false;
    }
    if kind == "search" || attr(sel, "role").eq_ignore_ascii_case("searchbox") {
        return true;
    }
    if SEARCH_VOCABULARY.is_match(&descriptive_attrs(sel)) {
        return true;
    }
    enclosing_form(sel).is_some_and(|form| {
        attr(&form, "role").eq_ignore_ascii_case("search")
            || SEARCH_VOCABULARY.is_match(&id_class(&form))
            || is_search_action(&attr(&form, "action"))
    })
}

/// Form action that looks like a search endpoint
#[must_use]
pub fn is_search_action(action: &str) -> bool {
    let action = action.to_lowercase();
    action.contains("/search") || action.contains("?s=") || action.contains("&s=") || action.ends_with("/find")
}

/// Element that wraps a search box
#[must_use]
pub fn is_search_container(sel: &Selection) -> bool {
    if !is_one_of_tags(sel, CONTAINER_TAGS) {
        return false;
    }
    if tag(sel) == "search" || attr(sel, "role").eq_ignore_ascii_case("search") {
        return true;
    }
    let desc = id_class(sel);
    !desc.is_empty() && SEARCH_VOCABULARY.is_match(&desc) && !EMAIL_VOCABULARY.is_match(&desc)
}

/// Submit control of a search box
#[must_use]
pub fn is_search_button(sel: &Selection) -> bool {
    let is_control = match tag(sel).as_str() {
        "button" => true,
        "input" => matches!(input_type(sel).as_str(), "submit" | "image"),
        _ => false,
    };
    if !is_control {
        return false;
    }
    let desc = format!("{} {}", descriptive_attrs(sel), sel.text().to_lowercase());
    SEARCH_VOCABULARY.is_match(&desc) || desc.contains("magnif")
}

/// Magnifier icon next to a search box
#[must_use]
pub fn is_search_icon(sel: &Selection) -> bool {
    if !is_one_of_tags(sel, &["svg", "i", "span", "img", "use"]) {
        return false;
    }
    let desc = format!(
        "{} {} {} {}",
        id_class(sel),
        attr(sel, "aria-label").to_lowercase(),
        attr(sel, "alt").to_lowercase(),
        attr(sel, "href").to_lowercase()
    );
    desc.contains("search") || desc.contains("magnif") || desc.contains("loupe")
}

/// Rules that make an element part of a search box
pub static SEARCH_PARTS: &[Rule] = &[is_search_input, is_search_button, is_search_icon];
