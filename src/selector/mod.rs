//! Selector Infrastructure
//!
//! Rules are plain predicate functions over a `Selection`. Stages combine
//! them with CSS selector tables: CSS narrows the candidates, rules make the
//! decisions CSS cannot express (vocabulary checks, exclusions).

use dom_query::Selection;

pub mod discard;
pub mod product;
pub mod search;
pub mod utils;

/// A selector rule that tests if a selection matches certain criteria
pub type Rule = fn(&Selection) -> bool;

/// Whether any rule in the table matches
#[must_use]
pub fn matches_any(sel: &Selection, rules: &[Rule]) -> bool {
    rules.iter().any(|rule| rule(sel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    fn is_target(sel: &Selection) -> bool {
        utils::class(sel).contains("target")
    }

    fn is_span(sel: &Selection) -> bool {
        utils::tag(sel) == "span"
    }

    #[test]
    fn test_matches_any() {
        let doc = dom::parse(r#"<span class="other">x</span>"#);
        let span = doc.select("span");
        assert!(matches_any(&span, &[is_target, is_span]));
        assert!(!matches_any(&span, &[is_target]));
    }
}
