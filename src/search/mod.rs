//! Search synthesis and the static search index.

pub mod index;
pub mod synthesizer;
pub mod tokenization;

use dom_query::Document;

use crate::dom::{self, escape_html};

pub use index::{collect_documents, IndexDocument, SearchHit, SearchIndex};
pub use synthesizer::{search_endpoint, synthesize_search, SearchEndpoint, SearchSynthesis};

/// File name of the static query script, shared by every replica.
pub const SEARCH_SCRIPT_NAME: &str = "pe-search.js";

/// Source of the static query script.
pub const SEARCH_SCRIPT: &str = include_str!("../assets/pe-search.js");

/// Index artifact name for a slug.
#[must_use]
pub fn index_file_name(slug: &str) -> String {
    format!("{slug}-search-index.json")
}

/// Reference the query script from the replica, pointed at the slug's index.
/// `param` names the query parameter of the synthesized search inputs.
pub fn inject_index_script(doc: &Document, slug: &str, max_results: usize, param: Option<&str>) {
    doc.select(&format!("script[src='{SEARCH_SCRIPT_NAME}']")).remove();
    let param_attr = param
        .map(|p| format!(" data-param=\"{}\"", escape_html(p)))
        .unwrap_or_default();
    let tag = format!(
        "<script src=\"{SEARCH_SCRIPT_NAME}\" data-index=\"{}\" data-max=\"{max_results}\"{param_attr} defer></script>",
        escape_html(&index_file_name(slug))
    );
    let body = doc.select("body");
    if body.exists() {
        dom::append_html(&body, &tag);
    }
}
