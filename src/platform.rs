//! Platform and framework detection.
//!
//! A `PlatformClassifier` tests the captured HTML and URL against an ordered
//! `SignatureTable`. Commerce/CMS detection and framework detection are two
//! independent groups; within the platform group landing-page builders are
//! tested before e-commerce and e-commerce before CMS, so a page built on a
//! dedicated landing product is not reported as its underlying store or CMS.

#![allow(clippy::expect_used)]

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Platform reported when no signature matches.
pub const DEFAULT_PLATFORM: &str = "custom";

/// Framework reported when no signature matches.
pub const DEFAULT_FRAMEWORK: &str = "vanilla";

/// Signature category, in platform-group priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformCategory {
    LandingBuilder,
    Ecommerce,
    Cms,
    Framework,
}

impl fmt::Display for PlatformCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LandingBuilder => "landing-builder",
            Self::Ecommerce => "e-commerce",
            Self::Cms => "cms",
            Self::Framework => "framework",
        })
    }
}

/// One named signature.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: String,
    pub category: PlatformCategory,
    pub pattern: Regex,
}

impl Signature {
    /// Compile a signature. The pattern is matched against lower-cased input.
    pub fn new(
        name: impl Into<String>,
        category: PlatformCategory,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            category,
            pattern: Regex::new(pattern)?,
        })
    }
}

/// Ordered, immutable list of signatures.
#[derive(Debug, Clone)]
pub struct SignatureTable {
    signatures: Vec<Signature>,
}

impl SignatureTable {
    #[must_use]
    pub fn new(signatures: Vec<Signature>) -> Self {
        Self { signatures }
    }

    /// Signatures in table order.
    #[must_use]
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    fn first_match(&self, category: PlatformCategory, haystack: &str) -> Option<&Signature> {
        self.signatures
            .iter()
            .filter(|s| s.category == category)
            .find(|s| s.pattern.is_match(haystack))
    }
}

const BUILTIN: &[(&str, PlatformCategory, &str)] = &[
    // Landing builders, including the ones that run on top of Shopify/WordPress.
    ("unbounce", PlatformCategory::LandingBuilder, r"unbounce|ubembed|ub-emb-"),
    ("instapage", PlatformCategory::LandingBuilder, r"instapage"),
    ("leadpages", PlatformCategory::LandingBuilder, r"leadpages|lp-pom-"),
    ("clickfunnels", PlatformCategory::LandingBuilder, r"clickfunnels|cf-section"),
    ("gempages", PlatformCategory::LandingBuilder, r"gempages|gp-row|gryffeditor"),
    ("pagefly", PlatformCategory::LandingBuilder, r"pagefly|__pf\b|pf-c-"),
    ("shogun", PlatformCategory::LandingBuilder, r"shogun-root|getshogun|shg-box"),
    ("replo", PlatformCategory::LandingBuilder, r"replo-|data-replo"),
    ("carrd", PlatformCategory::LandingBuilder, r"carrd\.co"),
    // E-commerce
    ("shopify", PlatformCategory::Ecommerce, r"cdn\.shopify\.com|myshopify\.com|shopify\.theme|window\.shopify"),
    ("woocommerce", PlatformCategory::Ecommerce, r"woocommerce|wc-block-|wc_add_to_cart"),
    ("bigcommerce", PlatformCategory::Ecommerce, r"bigcommerce\.com|stencil-utils"),
    ("magento", PlatformCategory::Ecommerce, r"mage/cookies|magento|data-mage-init"),
    ("salesforce-commerce", PlatformCategory::Ecommerce, r"demandware|dwanalytics"),
    ("prestashop", PlatformCategory::Ecommerce, r"prestashop"),
    ("wix-stores", PlatformCategory::Ecommerce, r"wixstores|wix-stores"),
    ("squarespace-commerce", PlatformCategory::Ecommerce, r"sqs-add-to-cart|squarespace-commerce"),
    // CMS
    ("wordpress", PlatformCategory::Cms, r"wp-content|wp-includes|wp-json"),
    ("squarespace", PlatformCategory::Cms, r"squarespace"),
    ("wix", PlatformCategory::Cms, r"wixstatic\.com|_wixcss|wix\.com"),
    ("webflow", PlatformCategory::Cms, r"webflow"),
    ("hubspot", PlatformCategory::Cms, r"hs-scripts\.com|hubspot"),
    ("drupal", PlatformCategory::Cms, r"drupal"),
    ("joomla", PlatformCategory::Cms, r"joomla"),
    ("ghost", PlatformCategory::Cms, r#"content="ghost|ghost-portal"#),
    // Frameworks, meta-frameworks before their base library.
    ("next", PlatformCategory::Framework, r"__next_data__|/_next/static"),
    ("nuxt", PlatformCategory::Framework, r"__nuxt|/_nuxt/"),
    ("gatsby", PlatformCategory::Framework, r"___gatsby|gatsby-image"),
    ("remix", PlatformCategory::Framework, r"__remixcontext"),
    ("sveltekit", PlatformCategory::Framework, r"__sveltekit|data-sveltekit"),
    ("angular", PlatformCategory::Framework, r"ng-version=|ng-app"),
    ("react", PlatformCategory::Framework, r"data-reactroot|react-dom|__react"),
    ("vue", PlatformCategory::Framework, r"data-v-[0-9a-f]{8}|vue(?:\.min)?\.js|__vue__"),
    ("svelte", PlatformCategory::Framework, r"svelte-[a-z0-9]{5,}"),
    ("alpine", PlatformCategory::Framework, r"x-data=|alpinejs"),
    ("jquery", PlatformCategory::Framework, r"jquery(?:\.min)?\.js|jquery-\d"),
];

static BUILTIN_TABLE: LazyLock<SignatureTable> = LazyLock::new(|| {
    SignatureTable::new(
        BUILTIN
            .iter()
            .map(|(name, category, pattern)| {
                Signature::new(*name, *category, pattern).expect("builtin platform signature")
            })
            .collect(),
    )
});

impl Default for SignatureTable {
    fn default() -> Self {
        BUILTIN_TABLE.clone()
    }
}

/// Detected platform and framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformReport {
    pub platform: String,
    pub platform_category: Option<PlatformCategory>,
    pub framework: String,
}

impl Default for PlatformReport {
    fn default() -> Self {
        Self {
            platform: DEFAULT_PLATFORM.to_string(),
            platform_category: None,
            framework: DEFAULT_FRAMEWORK.to_string(),
        }
    }
}

/// Pure classifier over captured HTML.
#[derive(Debug, Clone, Default)]
pub struct PlatformClassifier {
    table: SignatureTable,
}

impl PlatformClassifier {
    #[must_use]
    pub fn new(table: SignatureTable) -> Self {
        Self { table }
    }

    /// Label the platform and framework of a page.
    #[must_use]
    pub fn classify(&self, html: &str, url: &str) -> PlatformReport {
        let haystack = format!("{}\n{}", url.to_lowercase(), html.to_lowercase());

        let platform = [
            PlatformCategory::LandingBuilder,
            PlatformCategory::Ecommerce,
            PlatformCategory::Cms,
        ]
        .into_iter()
        .find_map(|category| self.table.first_match(category, &haystack));

        let framework = self
            .table
            .first_match(PlatformCategory::Framework, &haystack)
            .map_or_else(|| DEFAULT_FRAMEWORK.to_string(), |s| s.name.clone());

        match platform {
            Some(sig) => PlatformReport {
                platform: sig.name.clone(),
                platform_category: Some(sig.category),
                framework,
            },
            None => PlatformReport {
                framework,
                ..PlatformReport::default()
            },
        }
    }
}
