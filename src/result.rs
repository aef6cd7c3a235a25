//! Result types for extraction output.
//!
//! This module defines the structured records produced by one extraction
//! job: surveyed assets, video records, blocks, product cards, the search
//! descriptor and the aggregate `Metadata` written next to the HTML.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::PlatformReport;

/// Kind of a surveyed asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Input,
    Button,
    Image,
    Icon,
    Heading,
    Link,
    Video,
}

/// Immutable snapshot of one element taken during the survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Position in survey order. Blocks refer to assets by this id.
    pub id: usize,

    /// Asset kind.
    #[serde(rename = "type")]
    pub kind: AssetKind,

    /// Lowercase tag name.
    pub tag: String,

    /// Selected attributes (id, class, name, type, href, src, ...).
    pub attributes: BTreeMap<String, String>,

    /// Normalized visible text, capped.
    pub text: String,

    /// `outerHTML`, truncated to the configured cap.
    pub markup: String,

    /// Key of the nearest ancestor carrying an id or class, or `root`.
    pub parent_key: String,

    /// Class attribute of that ancestor.
    pub classnames: String,
}

impl Asset {
    /// Attribute value, empty when absent.
    #[must_use]
    pub fn attr(&self, name: &str) -> &str {
        self.attributes.get(name).map_or("", String::as_str)
    }
}

/// Kind of a resolved video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoKind {
    Html5,
    Youtube,
    Vimeo,
    Wistia,
    Widget,
    KeenSlide,
}

impl fmt::Display for VideoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Html5 => "html5",
            Self::Youtube => "youtube",
            Self::Vimeo => "vimeo",
            Self::Wistia => "wistia",
            Self::Widget => "widget",
            Self::KeenSlide => "keen-slide",
        };
        f.write_str(name)
    }
}

/// Rendered size captured from width/height attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Playback flags captured from the source element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct PlaybackFlags {
    pub controls: bool,
    pub autoplay: bool,
    #[serde(rename = "loop")]
    pub looped: bool,
    pub muted: bool,
    pub plays_inline: bool,
}

/// One video-bearing region of the page.
///
/// `index` is the join key with the `data-pe-video` placeholder marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: VideoKind,
    /// Ordered, de-duplicated canonical source URLs.
    pub source_urls: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub title: Option<String>,
    pub dimensions: Dimensions,
    pub flags: PlaybackFlags,
    /// Truncated markup of the tagged element, kept for diagnostics.
    pub markup_sample: String,
}

/// Semantic type of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    Hero,
    ProductGrid,
    FormBlock,
    #[serde(rename = "CTA")]
    Cta,
    SearchBlock,
    Generic,
}

/// Assets sharing one parent key, with the rule that typed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub parent_key: String,
    /// Asset ids, in survey order.
    pub assets: Vec<usize>,
    pub classnames: String,
    pub detection_reason: String,
    pub confidence: f64,
}

/// Evidence that contributed to a product card score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardClue {
    /// Anchor pointing to a product/detail/cart-like path (+2).
    ProductLink,
    /// Add-to-cart / buy control (+2).
    PurchaseAction,
    /// Image, heading and price in the same card (+2).
    ImageHeadingPrice,
    /// Class or id mentions a product keyword (+1).
    KeywordClass,
}

impl CardClue {
    /// Points awarded for this clue.
    #[must_use]
    pub fn points(self) -> u32 {
        match self {
            Self::ProductLink | Self::PurchaseAction | Self::ImageHeadingPrice => 2,
            Self::KeywordClass => 1,
        }
    }
}

/// One repeated product card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    pub assets: Vec<Asset>,
    pub score: u32,
    pub clues: Vec<CardClue>,
    pub title: Option<String>,
    pub price: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// The page's search box, as found before synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDescriptor {
    pub input_markup: String,
    pub submit_button_markup: Option<String>,
    pub icon_markup: Option<String>,
    /// Canonical absolute search endpoint.
    pub form_action: String,
    pub form_method: String,
    /// Query parameter the input submits as.
    pub param: String,
    pub container_markup: String,
}

/// Summary of a `<form>` seen during the survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub action: Option<String>,
    pub method: String,
    pub inputs: usize,
    pub buttons: usize,
}

/// Raw collections gathered in the survey pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCollections {
    /// Truncated markup of native `<video>` elements.
    pub videos: Vec<String>,
    /// Truncated markup of carousel/slider containers.
    pub carousels: Vec<String>,
    pub forms: Vec<FormSummary>,
    /// Truncated markup of buttons.
    pub buttons: Vec<String>,
}

/// How the stability wait ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityReport {
    /// The DOM went quiet (and widgets mounted) before the deadline.
    pub stable: bool,
    pub waited_ms: u64,
    pub polls: u32,
}

/// Lifecycle of one extraction job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Created,
    Loading,
    Stabilizing,
    Surveying,
    Sanitizing,
    Reconstructing,
    Indexing,
    Writing,
    Done,
    Failed,
}

impl JobState {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// Stages only move forward; any state before `Done` may fail.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        if next == Self::Failed {
            return !matches!(self, Self::Done | Self::Failed);
        }
        matches!(
            (self, next),
            (Self::Created, Self::Loading)
                | (Self::Loading, Self::Stabilizing)
                | (Self::Stabilizing, Self::Surveying)
                | (Self::Surveying, Self::Sanitizing)
                | (Self::Sanitizing, Self::Reconstructing)
                | (Self::Reconstructing, Self::Indexing)
                | (Self::Indexing, Self::Writing)
                | (Self::Writing, Self::Done)
        )
    }
}

/// Aggregate record written as `{slug}.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub url: String,
    pub title: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub platform: String,
    pub framework: String,
    pub videos: Vec<VideoRecord>,
    pub blocks: Vec<Block>,
    pub assets: Vec<Asset>,
    pub products: Vec<ProductCard>,
    /// Selector that produced the product cards, for diagnostics.
    pub product_selector: Option<String>,
    pub search: Option<SearchDescriptor>,
    pub collections: RawCollections,
    pub stability: Option<StabilityReport>,
    pub screenshot_path: Option<String>,
    pub search_index_path: Option<String>,
    pub state: JobState,
    /// Non-fatal problems met along the way.
    pub warnings: Vec<String>,
}

impl Metadata {
    pub(crate) fn apply_platform(&mut self, report: &PlatformReport) {
        self.platform.clone_from(&report.platform);
        self.framework.clone_from(&report.framework);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_moves_forward_only() {
        assert!(JobState::Created.can_advance_to(JobState::Loading));
        assert!(JobState::Indexing.can_advance_to(JobState::Writing));
        assert!(!JobState::Surveying.can_advance_to(JobState::Loading));
        assert!(!JobState::Loading.can_advance_to(JobState::Surveying));
        assert!(JobState::Stabilizing.can_advance_to(JobState::Failed));
        assert!(!JobState::Done.can_advance_to(JobState::Failed));
    }

    #[test]
    fn clue_points_match_scale() {
        let total: u32 = [
            CardClue::ProductLink,
            CardClue::PurchaseAction,
            CardClue::ImageHeadingPrice,
            CardClue::KeywordClass,
        ]
        .iter()
        .map(|c| c.points())
        .sum();
        assert_eq!(total, 7);
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let meta = Metadata {
            url: "https://example.com/".into(),
            platform: "shopify".into(),
            framework: "vanilla".into(),
            screenshot_path: Some("page.png".into()),
            ..Metadata::default()
        };
        let json = serde_json::to_value(&meta).unwrap_or_default();
        assert_eq!(json["screenshotPath"], "page.png");
        assert!(json.get("extractedAt").is_some());
        assert!(json.get("searchIndexPath").is_some());
        assert_eq!(json["state"], "created");
    }

    #[test]
    fn video_kind_uses_wire_names() {
        let json = serde_json::to_string(&VideoKind::KeenSlide).unwrap_or_default();
        assert_eq!(json, "\"keen-slide\"");
        assert_eq!(VideoKind::Html5.to_string(), "html5");
        let block = serde_json::to_string(&BlockType::Cta).unwrap_or_default();
        assert_eq!(block, "\"CTA\"");
    }
}
