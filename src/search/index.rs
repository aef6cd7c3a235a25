//! Static Index Builder
//!
//! A portable inverted index over document titles and descriptions,
//! serialized to `{slug}-search-index.json` and queried in the browser by
//! `pe-search.js`. `SearchIndex::query` ranks exactly like the script:
//!
//! - exact term hit: posting weight x 3
//! - prefix hit (query token of 2+ chars): posting weight x 2
//! - fuzzy hit within the token's edit budget: posting weight x 1
//! - whole query found in the normalized title: +10
//!
//! Title occurrences weigh `TITLE_BOOST` times a description occurrence.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::patterns::{normalize_whitespace, truncate_chars};
use crate::result::ProductCard;
use crate::search::tokenization::{bounded_edit_distance, fuzzy_budget, normalize_phrase, normalize_token, tokenize};

/// Index format version written into the JSON.
pub const INDEX_VERSION: u32 = 1;

/// Weight of a title token relative to a description token.
pub const TITLE_BOOST: u32 = 3;

const EXACT_FACTOR: u32 = 3;
const PREFIX_FACTOR: u32 = 2;
const FUZZY_FACTOR: u32 = 1;
const PHRASE_BONUS: u32 = 10;
const DESCRIPTION_CAP: usize = 300;

/// One searchable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub id: usize,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub image: Option<String>,
    pub price: Option<String>,
}

/// One term occurrence summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Document id.
    pub doc: usize,
    /// Title hits x `TITLE_BOOST` + description hits.
    pub weight: u32,
}

/// Serialized inverted index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndex {
    pub version: u32,
    pub documents: Vec<IndexDocument>,
    pub terms: BTreeMap<String, Vec<Posting>>,
}

/// One ranked query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<'a> {
    pub document: &'a IndexDocument,
    pub score: u32,
}

impl SearchIndex {
    /// Build from a document list. Ids are reassigned in order.
    #[must_use]
    pub fn build(documents: Vec<IndexDocument>) -> Self {
        let mut terms: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        let documents: Vec<IndexDocument> = documents
            .into_iter()
            .enumerate()
            .map(|(id, doc)| IndexDocument { id, ..doc })
            .collect();

        for doc in &documents {
            let mut weights: HashMap<String, u32> = HashMap::new();
            for token in tokenize(&doc.title) {
                *weights.entry(token).or_default() += TITLE_BOOST;
            }
            for token in tokenize(&doc.description) {
                *weights.entry(token).or_default() += 1;
            }
            for (term, weight) in weights {
                terms.entry(term).or_default().push(Posting { doc: doc.id, weight });
            }
        }
        for postings in terms.values_mut() {
            postings.sort_by_key(|p| p.doc);
        }

        Self {
            version: INDEX_VERSION,
            documents,
            terms,
        }
    }

    /// Rank documents for `query`, best first, at most `limit`.
    #[must_use]
    pub fn query(&self, query: &str, limit: usize) -> Vec<SearchHit<'_>> {
        let mut scores: HashMap<usize, u32> = HashMap::new();

        for token in tokenize(query) {
            let budget = fuzzy_budget(&token);
            for (term, postings) in &self.terms {
                let factor = if *term == token {
                    EXACT_FACTOR
                } else if token.chars().count() >= 2 && term.starts_with(token.as_str()) {
                    PREFIX_FACTOR
                } else if budget > 0 && bounded_edit_distance(term, &token, budget).is_some() {
                    FUZZY_FACTOR
                } else {
                    continue;
                };
                for posting in postings {
                    *scores.entry(posting.doc).or_default() += posting.weight * factor;
                }
            }
        }

        let phrase = normalize_phrase(query);
        if !phrase.is_empty() {
            for doc in &self.documents {
                if normalize_phrase(&doc.title).contains(&phrase) {
                    *scores.entry(doc.id).or_default() += PHRASE_BONUS;
                }
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .filter_map(|(id, score)| self.documents.get(id).map(|document| SearchHit { document, score }))
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.document.id.cmp(&b.document.id)));
        hits.truncate(limit);
        hits
    }

    /// Whether a term is indexed, after normalization.
    #[must_use]
    pub fn contains_term(&self, term: &str) -> bool {
        self.terms.contains_key(&normalize_token(term))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Documents for a page: one per product card with a title or description,
/// else one for the page itself.
#[must_use]
pub fn collect_documents(
    cards: &[ProductCard],
    page_title: Option<&str>,
    page_description: Option<&str>,
    page_url: &str,
) -> Vec<IndexDocument> {
    let from_cards: Vec<IndexDocument> = cards
        .iter()
        .filter_map(|card| {
            let title = card.title.as_deref().map(normalize_whitespace).unwrap_or_default();
            let description = card
                .description
                .as_deref()
                .map(|d| truncate_chars(&normalize_whitespace(d), DESCRIPTION_CAP))
                .unwrap_or_default();
            if title.is_empty() && description.is_empty() {
                return None;
            }
            Some(IndexDocument {
                id: 0,
                title,
                description,
                url: card.url.clone(),
                image: card.image.clone(),
                price: card.price.clone(),
            })
        })
        .collect();
    if !from_cards.is_empty() {
        return from_cards;
    }

    let title = page_title.map(normalize_whitespace).unwrap_or_default();
    let description = page_description
        .map(|d| truncate_chars(&normalize_whitespace(d), DESCRIPTION_CAP))
        .unwrap_or_default();
    if title.is_empty() && description.is_empty() {
        return Vec::new();
    }
    vec![IndexDocument {
        id: 0,
        title,
        description,
        url: Some(page_url.to_string()),
        image: None,
        price: None,
    }]
}
