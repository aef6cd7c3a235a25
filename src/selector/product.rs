//! Product Card Selectors
//!
//! Per-platform CSS selector lists for repeated product cards, with a
//! generic list of class fragments used when the platform has no entry.
//! Platform selectors are precise but brittle; the resolver tries them in
//! order and falls back to clue scoring when none matches.

use std::collections::HashMap;

/// Generic class fragments tried when the platform has no list.
pub const GENERIC_CARD_SELECTORS: &[&str] = &[
    ".product-card",
    "[class*='product-card']",
    ".card",
    ".item",
    ".tile",
    ".sku",
    ".listing",
];

const BUILTIN: &[(&str, &[&str])] = &[
    (
        "shopify",
        &[
            ".product-card-wrapper",
            ".product-item",
            ".grid-product",
            ".productgrid--item",
            ".card--product",
            ".product-grid-item",
        ],
    ),
    ("woocommerce", &["li.product", ".wc-block-grid__product", ".type-product"]),
    ("bigcommerce", &[".productGrid .product", "article.card"]),
    ("magento", &["li.product-item", ".product-item-info"]),
    ("salesforce-commerce", &[".product-tile", ".product[data-pid]"]),
    ("prestashop", &["article.product-miniature", ".product-miniature"]),
    ("squarespace-commerce", &[".ProductList-item", ".grid-item"]),
    ("wix-stores", &["[data-hook='product-list-grid-item']"]),
];

/// Immutable platform → selector list mapping.
#[derive(Debug, Clone)]
pub struct ProductSelectorTable {
    by_platform: HashMap<String, Vec<String>>,
    generic: Vec<String>,
}

impl ProductSelectorTable {
    /// Build a table from explicit lists.
    #[must_use]
    pub fn new(by_platform: HashMap<String, Vec<String>>, generic: Vec<String>) -> Self {
        Self { by_platform, generic }
    }

    /// Selector list for `platform`, or the generic list.
    #[must_use]
    pub fn selectors_for(&self, platform: &str) -> &[String] {
        self.by_platform
            .get(platform)
            .filter(|list| !list.is_empty())
            .map_or(self.generic.as_slice(), Vec::as_slice)
    }
}

impl Default for ProductSelectorTable {
    fn default() -> Self {
        let by_platform = BUILTIN
            .iter()
            .map(|(platform, list)| {
                ((*platform).to_string(), list.iter().map(|s| (*s).to_string()).collect())
            })
            .collect();
        let generic = GENERIC_CARD_SELECTORS.iter().map(|s| (*s).to_string()).collect();
        Self::new(by_platform, generic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_platform_gets_its_list() {
        let table = ProductSelectorTable::default();
        assert_eq!(table.selectors_for("woocommerce")[0], "li.product");
    }

    #[test]
    fn test_unknown_platform_gets_generic() {
        let table = ProductSelectorTable::default();
        let generic = table.selectors_for("custom");
        assert_eq!(generic.len(), GENERIC_CARD_SELECTORS.len());
        assert!(generic.iter().any(|s| s == ".tile"));
    }

    #[test]
    fn test_empty_platform_list_falls_back() {
        let mut map = HashMap::new();
        map.insert("acme".to_string(), Vec::new());
        let table = ProductSelectorTable::new(map, vec![".card".into()]);
        assert_eq!(table.selectors_for("acme"), [".card".to_string()]);
    }
}
