//! Video/widget resolution and reconstruction.
//!
//! The resolver tags every video-bearing element with a `data-pe-video`
//! placeholder marker whose value is the `VideoRecord::index`; the
//! reconstructor later swaps each marked element for a self-contained embed.

pub mod reconstruct;
pub mod resolver;
pub mod sources;

pub use reconstruct::{reconstruct_videos, render_record, ReconstructReport};
pub use resolver::{resolve_videos, WidgetTable};

/// Placeholder marker attribute. Its value is the record index.
pub const MARKER_ATTR: &str = "data-pe-video";

/// CSS selector for the marker of one record.
#[must_use]
pub fn marker_selector(index: usize) -> String {
    format!("[{MARKER_ATTR}=\"{index}\"]")
}
