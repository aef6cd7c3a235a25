//! URL Utility Functions
//!
//! URL validation and resolution used when absolutizing captured markup and
//! when deriving the canonical search endpoint of a page.

use url::Url;

/// Check if a string is a valid absolute http(s) URL.
///
/// # Returns
/// * `(is_absolute, parsed_url)` - Whether URL is absolute and the parsed URL if valid
#[must_use]
pub fn is_absolute_url(s: &str) -> (bool, Option<Url>) {
    let s = s.trim();

    if s.is_empty() {
        return (false, None);
    }

    // Must start with http:// or https://
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return (false, None);
    }

    match Url::parse(s) {
        Ok(url) if url.host().is_some() => (true, Some(url)),
        _ => (false, None),
    }
}

/// Convert a relative or absolute URL to absolute form.
///
/// Fragment-only references and non-fetchable schemes (data, javascript,
/// mailto, tel, blob, about) are returned unchanged. Protocol-relative URLs
/// take the base scheme.
///
/// # Returns
/// * The absolute URL string, or the original if resolution fails
#[must_use]
pub fn create_absolute_url(url_str: &str, base: &Url) -> String {
    let url_str = url_str.trim();

    if url_str.is_empty() {
        return String::new();
    }

    if url_str.starts_with('#') || has_special_scheme(url_str) {
        return url_str.to_string();
    }

    let (is_abs, _) = is_absolute_url(url_str);
    if is_abs {
        return url_str.to_string();
    }

    match base.join(url_str) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => url_str.to_string(),
    }
}

fn has_special_scheme(url_str: &str) -> bool {
    const SPECIAL: &[&str] = &["data:", "javascript:", "mailto:", "tel:", "blob:", "about:"];
    let lower = url_str.to_ascii_lowercase();
    SPECIAL.iter().any(|s| lower.starts_with(s))
}

/// Absolutize every candidate of a `srcset` value, keeping descriptors.
#[must_use]
pub fn absolutize_srcset(srcset: &str, base: &Url) -> String {
    srcset
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|candidate| {
            let mut parts = candidate.splitn(2, char::is_whitespace);
            let url = parts.next().unwrap_or_default();
            let descriptor = parts.next().map(str::trim).unwrap_or_default();
            let resolved = create_absolute_url(url, base);
            if descriptor.is_empty() {
                resolved
            } else {
                format!("{resolved} {descriptor}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extract the hostname (domain) from a URL.
///
/// # Returns
/// * The hostname, or empty string if invalid
#[must_use]
pub fn get_domain_url(url_str: &str) -> String {
    parse_url(url_str)
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

/// Hostname with a leading `www.` removed.
#[must_use]
pub fn bare_domain(url_str: &str) -> String {
    let domain = get_domain_url(url_str);
    domain
        .strip_prefix("www.")
        .map_or_else(|| domain.clone(), str::to_string)
}

/// Get the origin (scheme, host and non-default port) of a URL.
///
/// # Returns
/// * The origin in format `scheme://host[:port]`, or empty string if invalid
#[must_use]
pub fn get_base_url(url_str: &str) -> String {
    let Some(url) = parse_url(url_str) else {
        return String::new();
    };
    let Some(host) = url.host_str() else {
        return String::new();
    };
    match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    }
}

/// Parse a URL string into a Url object.
///
/// # Returns
/// * `Some(Url)` if valid absolute URL, `None` otherwise
#[must_use]
pub fn parse_url(url_str: &str) -> Option<Url> {
    match is_absolute_url(url_str) {
        (true, parsed) => parsed,
        (false, _) => None,
    }
}

/// Whether the URL's host belongs to `domain` (exact or subdomain).
#[must_use]
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_start_matches("www.");
    let domain = domain.trim_start_matches("www.");
    host.eq_ignore_ascii_case(domain)
        || host
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        match Url::parse("https://shop.example.com/collections/all?page=2") {
            Ok(u) => u,
            Err(e) => panic!("base url: {e}"),
        }
    }

    #[test]
    fn test_is_absolute_url() {
        assert!(is_absolute_url("https://example.com/a").0);
        assert!(is_absolute_url("HTTP://EXAMPLE.COM").0);
        assert!(!is_absolute_url("/relative/path").0);
        assert!(!is_absolute_url("mailto:a@b.c").0);
        assert!(!is_absolute_url("").0);
    }

    #[test]
    fn test_create_absolute_url() {
        let base = base();
        assert_eq!(create_absolute_url("/products/x", &base), "https://shop.example.com/products/x");
        assert_eq!(create_absolute_url("img/a.png", &base), "https://shop.example.com/collections/img/a.png");
        assert_eq!(create_absolute_url("//cdn.example.com/a.js", &base), "https://cdn.example.com/a.js");
        assert_eq!(create_absolute_url("https://other.com/", &base), "https://other.com/");
    }

    #[test]
    fn test_special_urls_are_preserved() {
        let base = base();
        for url in ["#top", "data:image/png;base64,AAA", "javascript:void(0)", "mailto:a@b.c", "tel:123"] {
            assert_eq!(create_absolute_url(url, &base), url);
        }
    }

    #[test]
    fn test_absolutize_srcset() {
        let base = base();
        let out = absolutize_srcset("/a.jpg 1x, b.jpg 2x,https://x.com/c.jpg", &base);
        assert_eq!(
            out,
            "https://shop.example.com/a.jpg 1x, https://shop.example.com/collections/b.jpg 2x, https://x.com/c.jpg"
        );
    }

    #[test]
    fn test_domain_and_origin() {
        assert_eq!(get_domain_url("https://WWW.Example.com/x"), "www.example.com");
        assert_eq!(bare_domain("https://www.example.com/x"), "example.com");
        assert_eq!(get_base_url("http://localhost:8080/a/b"), "http://localhost:8080");
        assert_eq!(get_base_url("https://example.com/a"), "https://example.com");
        assert_eq!(get_base_url("not a url"), "");
    }

    #[test]
    fn test_host_matches() {
        assert!(host_matches("www.example.com", "example.com"));
        assert!(host_matches("eu.shop.example.com", "example.com"));
        assert!(!host_matches("badexample.com", "example.com"));
    }
}
