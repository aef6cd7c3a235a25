//! Search Synthesizer
//!
//! The replica is served from another origin, so a search box only works if
//! it submits straight to the original site's search endpoint. Every search
//! input ends up inside a GET form pointing at that endpoint, named after its
//! query parameter, with a submit control. A fallback script covers inputs
//! that mount after the snapshot.

use dom_query::{Document, Selection};
use tracing::debug;
use url::Url;

use crate::dom::{self, escape_html};
use crate::options::{SearchOptions, SearchOverride};
use crate::patterns::truncate_chars;
use crate::result::SearchDescriptor;
use crate::selector::search::{enclosing_form, is_search_button, is_search_container, is_search_icon, is_search_input};
use crate::selector::utils::is_one_of_tags;
use crate::url_utils::{bare_domain, get_base_url, host_matches};

/// Temporary stamp that survives the form wrapping.
const WIRE_ATTR: &str = "data-pe-search-input";

/// Attribute on the injected fallback script.
pub const FALLBACK_ATTR: &str = "data-pe-search-fallback";

const FALLBACK_TEMPLATE: &str = include_str!("../assets/search-fallback.js");

const SUBMIT_CONTROLS: &str =
    "button:not([type='button']):not([type='reset']), input[type='submit'], input[type='image']";

const CONTAINER_MARKUP_CAP: usize = 2_000;

/// Platforms whose search lives at `/?s=`.
const WORDPRESS_PLATFORMS: &[&str] = &["wordpress", "woocommerce"];

/// Canonical search endpoint of an origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEndpoint {
    /// Absolute form action.
    pub action: String,
    /// Query parameter name.
    pub param: String,
}

impl SearchEndpoint {
    /// Full search URL for a query.
    #[must_use]
    pub fn url_for(&self, query: &str) -> String {
        let mut url = match Url::parse(&self.action) {
            Ok(u) => u,
            Err(_) => return format!("{}?{}={query}", self.action, self.param),
        };
        url.query_pairs_mut().append_pair(&self.param, query);
        url.to_string()
    }
}

/// Outcome of search synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSynthesis {
    /// Descriptor of the first wired search box.
    pub descriptor: Option<SearchDescriptor>,
    pub inputs_wired: usize,
    pub forms_created: usize,
    pub submits_added: usize,
    pub fallback_injected: bool,
}

/// Resolve the search endpoint for `page_url`.
///
/// Precedence: per-domain override, WordPress/WooCommerce `/?s=`, then
/// `/search?q=`.
#[must_use]
pub fn search_endpoint(page_url: &Url, platform: &str, overrides: &[SearchOverride]) -> SearchEndpoint {
    let origin = get_base_url(page_url.as_str());
    let host = bare_domain(page_url.as_str());

    if let Some(rule) = overrides.iter().find(|o| host_matches(&host, &o.domain)) {
        let path = if rule.path.starts_with('/') {
            rule.path.clone()
        } else {
            format!("/{}", rule.path)
        };
        return SearchEndpoint {
            action: format!("{origin}{path}"),
            param: rule.param.clone(),
        };
    }

    if WORDPRESS_PLATFORMS.contains(&platform) {
        return SearchEndpoint {
            action: format!("{origin}/"),
            param: "s".to_string(),
        };
    }

    SearchEndpoint {
        action: format!("{origin}/search"),
        param: "q".to_string(),
    }
}

/// Wire every search input to `endpoint` and inject the fallback script.
pub fn synthesize_search(
    doc: &Document,
    page_url: &Url,
    endpoint: &SearchEndpoint,
    options: &SearchOptions,
) -> SearchSynthesis {
    let mut report = SearchSynthesis::default();

    let inputs: Vec<Selection> = doc.select("input").iter().filter(is_search_input).collect();
    for (i, input) in inputs.iter().enumerate() {
        dom::set_attribute(input, WIRE_ATTR, &i.to_string());
    }

    for i in 0..inputs.len() {
        let input = doc.select(&wire_selector(i)).first();
        if input.exists() && wire_input(doc, &input, i, endpoint, &mut report) {
            report.inputs_wired += 1;
        }
    }

    let first = doc.select(&wire_selector(0)).first();
    doc.select(&format!("[{WIRE_ATTR}]")).remove_attr(WIRE_ATTR);
    if first.exists() {
        report.descriptor = Some(describe(&first, endpoint));
    }

    if options.inject_fallback {
        inject_fallback(doc, page_url, endpoint, options);
        report.fallback_injected = true;
    }

    debug!(
        inputs = report.inputs_wired,
        forms = report.forms_created,
        submits = report.submits_added,
        "search synthesized"
    );
    report
}

fn wire_selector(i: usize) -> String {
    format!("[{WIRE_ATTR}=\"{i}\"]")
}

fn wire_input(doc: &Document, input: &Selection, i: usize, endpoint: &SearchEndpoint, report: &mut SearchSynthesis) -> bool {
    dom::set_attribute(input, "name", &endpoint.param);

    let form = match enclosing_form(input) {
        Some(form) => form,
        None => {
            wrap_in_form(input, endpoint);
            report.forms_created += 1;
            let moved = doc.select(&wire_selector(i)).first();
            match enclosing_form(&moved) {
                Some(form) => form,
                None => return false,
            }
        }
    };

    dom::set_attribute(&form, "action", &endpoint.action);
    dom::set_attribute(&form, "method", "get");
    if !form.select(SUBMIT_CONTROLS).exists() {
        dom::append_html(
            &form,
            "<button type=\"submit\" class=\"pe-search-submit\" tabindex=\"-1\" aria-hidden=\"true\" style=\"display:none\">Search</button>",
        );
        report.submits_added += 1;
    }
    true
}

/// Wrap the nearest search-like container (else the parent, else the input
/// alone) in a new form.
fn wrap_in_form(input: &Selection, endpoint: &SearchEndpoint) {
    let candidates: Vec<Selection> = dom::ancestors(input)
        .into_iter()
        .take_while(|a| !is_one_of_tags(a, &["body", "html", "head"]))
        .collect();
    let container = candidates
        .iter()
        .find(|a| is_search_container(a))
        .or_else(|| candidates.first())
        .filter(|c| !c.select("form").exists())
        .cloned();
    let target = container.unwrap_or_else(|| input.clone());

    let html = format!(
        "<form class=\"pe-search-form\" role=\"search\" action=\"{}\" method=\"get\">{}</form>",
        escape_html(&endpoint.action),
        dom::outer_html(&target)
    );
    dom::replace_with_html(&target, &html);
}

fn describe(input: &Selection, endpoint: &SearchEndpoint) -> SearchDescriptor {
    let scope = enclosing_form(input).unwrap_or_else(|| input.parent());

    let submit = scope
        .select(SUBMIT_CONTROLS)
        .iter()
        .find(is_search_button)
        .or_else(|| scope.select(SUBMIT_CONTROLS).iter().next());
    let icon = scope
        .select("svg, i, span, img, use")
        .iter()
        .find(is_search_icon)
        .or_else(|| {
            dom::ancestors(&scope)
                .into_iter()
                .find(is_search_container)
                .and_then(|c| c.select("svg, i, span, img").iter().find(is_search_icon))
        });

    SearchDescriptor {
        input_markup: dom::outer_html(input).to_string(),
        submit_button_markup: submit.map(|s| dom::outer_html(&s).to_string()),
        icon_markup: icon.map(|s| dom::outer_html(&s).to_string()),
        form_action: endpoint.action.clone(),
        form_method: "GET".to_string(),
        param: endpoint.param.clone(),
        container_markup: truncate_chars(&dom::outer_html(&scope), CONTAINER_MARKUP_CAP),
    }
}

/// Script source for the fallback handler.
#[must_use]
pub fn render_fallback(page_url: &Url, endpoint: &SearchEndpoint, options: &SearchOptions) -> String {
    let literal = |s: &str| {
        serde_json::to_string(s)
            .unwrap_or_else(|_| "\"\"".to_string())
            .replace("</", "<\\/")
    };
    FALLBACK_TEMPLATE
        .replace("__PE_ORIGIN__", &literal(&get_base_url(page_url.as_str())))
        .replace("__PE_SEARCH_URL__", &literal(&endpoint.action))
        .replace("__PE_PARAM__", &literal(&endpoint.param))
        .replace("__PE_ATTEMPTS__", &options.fallback_attempts.to_string())
        .replace("__PE_INTERVAL__", &options.fallback_interval_ms.to_string())
}

fn inject_fallback(doc: &Document, page_url: &Url, endpoint: &SearchEndpoint, options: &SearchOptions) {
    doc.select(&format!("script[{FALLBACK_ATTR}]")).remove();
    let origin = get_base_url(page_url.as_str());
    let script = format!(
        "<script {FALLBACK_ATTR}=\"\" data-pe-origin=\"{}\">{}</script>",
        escape_html(&origin),
        render_fallback(page_url, endpoint, options)
    );
    let body = doc.select("body");
    if body.exists() {
        dom::append_html(&body, &script);
    } else {
        dom::append_html(&doc.select("html"), &script);
    }
}
