//! Index tokenization.
//!
//! Split on non-alphanumerics, lowercase, strip accents, drop stop words.
//! `pe-search.js` applies the same steps to queries in the browser.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Words never indexed.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "if", "in", "into", "is",
    "it", "its", "no", "not", "of", "on", "or", "our", "such", "that", "the", "their", "then",
    "there", "these", "they", "this", "to", "was", "we", "will", "with", "you", "your",
];

/// Tokens of `text` in order, duplicates kept.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(normalize_token)
        .filter(|s| !s.is_empty() && !is_stop_word(s))
        .collect()
}

/// Lowercase and accent-stripped form of one token.
#[must_use]
pub fn normalize_token(token: &str) -> String {
    token.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)).collect()
}

#[must_use]
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Normalized phrase form used for whole-title matching.
///
/// Stop words are kept so a title made only of them still matches itself.
#[must_use]
pub fn normalize_phrase(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(normalize_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Edit distance between `a` and `b`, or `None` once it exceeds `max`.
#[must_use]
pub fn bounded_edit_distance(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        let mut best = row[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
            best = best.min(row[j + 1]);
        }
        if best > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut row);
    }
    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}

/// Edits tolerated when fuzzy-matching a query token.
#[must_use]
pub fn fuzzy_budget(token: &str) -> usize {
    match token.chars().count() {
        0..=3 => 0,
        4..=7 => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_normalized() {
        assert_eq!(tokenize("The Crème-Brûlée SET, for 2"), vec!["creme", "brulee", "set", "2"]);
    }

    #[test]
    fn phrase_keeps_stop_words() {
        assert_eq!(normalize_phrase("The   Ölfass!"), "the olfass");
        assert_eq!(normalize_phrase("To be"), "to be");
    }

    #[test]
    fn edit_distance_is_bounded() {
        assert_eq!(bounded_edit_distance("hoodie", "hoody", 2), Some(2));
        assert_eq!(bounded_edit_distance("sneaker", "sneakers", 1), Some(1));
        assert_eq!(bounded_edit_distance("mug", "jacket", 2), None);
        assert_eq!(bounded_edit_distance("", "ab", 2), Some(2));
    }

    #[test]
    fn short_tokens_get_no_fuzz() {
        assert_eq!(fuzzy_budget("tee"), 0);
        assert_eq!(fuzzy_budget("shirt"), 1);
        assert_eq!(fuzzy_budget("sweatshirt"), 2);
    }
}
