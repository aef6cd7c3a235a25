//! Third-Party Chrome Patterns
//!
//! Identifies elements injected into a page by consent managers, chat
//! vendors, cart drawers, loaders and pixel managers. None of them survive
//! replay from another origin, so the sanitizer removes them.
//!
//! Two layers: a CSS table of well-known vendor mounts, and vocabulary rules
//! over id/class for the long tail.

use dom_query::Selection;

use crate::patterns::CHAT_VENDOR;
use crate::selector::utils::{attr, id_class, is_one_of_tags, tag};
use crate::selector::Rule;

/// Well-known vendor mounts, matched with CSS.
pub const DISCARD_SELECTORS: &[&str] = &[
    // Consent managers
    "#onetrust-consent-sdk",
    "#onetrust-banner-sdk",
    "#CybotCookiebotDialog",
    "#usercentrics-root",
    "#truste-consent-track",
    ".cc-window",
    ".cky-consent-container",
    "#cookie-law-info-bar",
    "#shopify-pc__banner",
    // Chat widgets
    "#intercom-container",
    ".intercom-lightweight-app",
    "#hubspot-messages-iframe-container",
    "#drift-widget-container",
    "#tidio-chat",
    "#gorgias-chat-container",
    "#launcher",
    "#chat-button",
    ".crisp-client",
    "#tawkchat-container",
    "#shopify-chat",
    // Cart drawers
    "cart-drawer",
    "#CartDrawer",
    ".cart-drawer",
    "#cart-notification",
    ".mini-cart",
    // Loaders
    ".loading-spinner",
    ".preloader",
    "#preloader",
    // Pixel managers and vendor injections
    "noscript",
    "#fb-root",
    "iframe[src*='googletagmanager.com']",
    "iframe[src*='doubleclick.net']",
    "img[width='1'][height='1']",
    "link[href*='static.klaviyo.com']",
    "style[id^='klaviyo']",
    "[id^='attentive_']",
    "#web-pixels-manager-sandbox-container",
];

/// Tags the vocabulary rules may remove. Structural tags are never touched.
const REMOVABLE_TAGS: &[&str] = &["div", "section", "aside", "dialog", "iframe", "span", "ul", "form"];

/// Consent and cookie banners
#[must_use]
pub fn is_consent_banner(sel: &Selection) -> bool {
    if !is_one_of_tags(sel, REMOVABLE_TAGS) {
        return false;
    }
    let desc = id_class(sel);
    desc.contains("cookie-banner")
        || desc.contains("cookie-consent")
        || desc.contains("cookie-notice")
        || desc.contains("cookiebar")
        || desc.contains("consent-banner")
        || desc.contains("gdpr")
        || attr(sel, "aria-label").to_lowercase().contains("cookie")
}

/// Live chat launchers and frames
#[must_use]
pub fn is_chat_widget(sel: &Selection) -> bool {
    if !is_one_of_tags(sel, REMOVABLE_TAGS) {
        return false;
    }
    let desc = id_class(sel);
    CHAT_VENDOR.is_match(&desc) || CHAT_VENDOR.is_match(&attr(sel, "src")) || desc.contains("chat-widget")
}

/// Spinners and loading overlays
#[must_use]
pub fn is_loader(sel: &Selection) -> bool {
    if !is_one_of_tags(sel, &["div", "span", "section"]) {
        return false;
    }
    let desc = id_class(sel);
    desc.split_whitespace()
        .any(|t| matches!(t, "spinner" | "loader" | "loading" | "page-loader" | "loading-overlay"))
}

/// Popups and flyouts injected by marketing tools
#[must_use]
pub fn is_marketing_overlay(sel: &Selection) -> bool {
    if !is_one_of_tags(sel, REMOVABLE_TAGS) {
        return false;
    }
    let desc = id_class(sel);
    desc.contains("klaviyo-form")
        || desc.contains("needsclick")
        || desc.contains("privy-")
        || desc.contains("justuno")
        || desc.contains("optinmonster")
        || (desc.contains("popup") && desc.contains("newsletter"))
}

/// Zero-size tracking frames
#[must_use]
pub fn is_tracking_frame(sel: &Selection) -> bool {
    tag(sel) == "iframe"
        && (matches!(attr(sel, "width").as_str(), "0" | "1")
            || matches!(attr(sel, "height").as_str(), "0" | "1")
            || attr(sel, "style").replace(' ', "").contains("display:none"))
}

/// Vocabulary rules for injected chrome
pub static THIRD_PARTY_CHROME: &[Rule] = &[
    is_consent_banner,
    is_chat_widget,
    is_loader,
    is_marketing_overlay,
    is_tracking_frame,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;
    use crate::selector::matches_any;

    fn check(html: &str, css: &str) -> bool {
        let doc = dom::parse(html);
        let sel = doc.select(css).first();
        matches_any(&sel, THIRD_PARTY_CHROME)
    }

    #[test]
    fn test_consent_and_chat() {
        assert!(check(r#"<div class="site-cookie-banner">We use cookies</div>"#, "div"));
        assert!(check(r#"<iframe src="https://widget.intercom.io/x"></iframe>"#, "iframe"));
        assert!(check(r#"<div id="gorgias-chat"></div>"#, "div"));
    }

    #[test]
    fn test_chat_vendors_match_whole_tokens() {
        assert!(check(r#"<div class="drift-frame-controller"></div>"#, "div"));
        assert!(check(r#"<div id="tawkchat-minified"></div>"#, "div"));
        assert!(!check(r#"<section class="drifting-hero"><h1>Sale</h1></section>"#, "section"));
        assert!(!check(r#"<div class="intercomm-panel"></div>"#, "div"));
    }

    #[test]
    fn test_structural_tags_are_never_matched() {
        assert!(!check(r#"<body class="cookie-consent-open"><p>x</p></body>"#, "body"));
        assert!(!check(r#"<main class="gdpr"><p>x</p></main>"#, "main"));
    }

    #[test]
    fn test_loader_tokens_are_exact() {
        assert!(check(r#"<div class="spinner"></div>"#, "div"));
        assert!(!check(r#"<div class="loader-text-content">Reviews</div>"#, "div"));
    }

    #[test]
    fn test_tracking_frame() {
        assert!(check(r#"<iframe width="1" height="1" src="https://t.example/p"></iframe>"#, "iframe"));
        assert!(!check(r#"<iframe width="560" height="315" src="https://www.youtube.com/embed/x"></iframe>"#, "iframe"));
    }

    #[test]
    fn test_content_is_not_chrome() {
        assert!(!check(r#"<div class="product-grid"><a href="/p/1">x</a></div>"#, "div"));
    }
}
