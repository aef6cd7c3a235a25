//! Video source discovery.
//!
//! Collects canonical source URLs, a thumbnail, a title and playback flags
//! from a DOM subtree. Evidence is gathered in a fixed order and accumulated
//! into an ordered, de-duplicated set:
//!
//! 1. native `<video>`/`<source>` elements (live `currentSrc` first)
//! 2. iframes on known video hosts
//! 3. `contentUrl`/`embedUrl`/`thumbnailUrl` microdata
//! 4. a fixed list of `data-*` video attributes, bare ids expanded per host
//! 5. inline script text and JSON configuration blobs
//!
//! Materialized shadow roots are ordinary descendants by the time this runs,
//! so they are searched by the same procedure.

use std::collections::HashSet;

use dom_query::Selection;
use url::Url;

use crate::dom;
use crate::patterns::{
    JSON_THUMBNAIL, MEDIA_FILE_URL, VIMEO_ID, VIMEO_URL, WISTIA_ID, WISTIA_URL, YOUTUBE_ID, YOUTUBE_URL,
};
use crate::result::{Dimensions, PlaybackFlags, VideoKind};
use crate::selector::utils::{attr, tag};
use crate::url_utils::create_absolute_url;

/// Attribute the snapshot script stamps with a video's live `currentSrc`.
pub const CURRENT_SRC_ATTR: &str = "data-pe-current-src";

/// Attribute the snapshot script stamps with live playback flags.
pub const LIVE_FLAGS_ATTR: &str = "data-pe-flags";

/// `data-*` attributes that carry a video URL or bare id.
pub const VIDEO_DATA_ATTRIBUTES: &[&str] = &[
    "data-video-id",
    "data-youtube-id",
    "data-youtube",
    "data-yt-id",
    "data-vimeo-id",
    "data-vimeo",
    "data-wistia-id",
    "data-wistia",
    "data-video-url",
    "data-video-src",
    "data-video",
    "data-embed-url",
    "data-media-url",
    "data-mp4",
    "data-hls",
    "data-content-url",
    "content-url",
];

/// Attributes naming the host of a bare id.
const PROVIDER_ATTRIBUTES: &[&str] = &["data-video-provider", "data-provider", "data-platform", "data-video-type", "data-type"];

/// What a single URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlTarget {
    /// Direct media file.
    Media,
    Youtube(String),
    Vimeo(String),
    Wistia(String),
    Other,
}

impl UrlTarget {
    /// Host kind for embeddable targets.
    #[must_use]
    pub fn host_kind(&self) -> Option<VideoKind> {
        match self {
            Self::Youtube(_) => Some(VideoKind::Youtube),
            Self::Vimeo(_) => Some(VideoKind::Vimeo),
            Self::Wistia(_) => Some(VideoKind::Wistia),
            Self::Media | Self::Other => None,
        }
    }
}

fn capture_1(re: &regex::Regex, text: &str) -> Option<String> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

/// Classify a URL by the video host or file type it points at.
#[must_use]
pub fn classify_url(url: &str) -> UrlTarget {
    if let Some(id) = capture_1(&YOUTUBE_URL, url) {
        return UrlTarget::Youtube(id);
    }
    if let Some(id) = capture_1(&VIMEO_URL, url) {
        return UrlTarget::Vimeo(id);
    }
    if let Some(id) = capture_1(&WISTIA_URL, url) {
        return UrlTarget::Wistia(id);
    }
    if MEDIA_FILE_URL.is_match(url) {
        return UrlTarget::Media;
    }
    UrlTarget::Other
}

/// Whether a URL points at YouTube, Vimeo or Wistia.
#[must_use]
pub fn is_video_host(url: &str) -> bool {
    !url.is_empty() && classify_url(url).host_kind().is_some()
}

/// Canonical embed URL for a host id.
#[must_use]
pub fn embed_url(kind: VideoKind, id: &str) -> Option<String> {
    match kind {
        VideoKind::Youtube => Some(format!("https://www.youtube.com/embed/{id}")),
        VideoKind::Vimeo => Some(format!("https://player.vimeo.com/video/{id}")),
        VideoKind::Wistia => Some(format!("https://fast.wistia.net/embed/iframe/{id}")),
        _ => None,
    }
}

/// Rewrite host URLs into their canonical embed form.
#[must_use]
pub fn canonicalize(url: &str) -> String {
    let embed = match classify_url(url) {
        UrlTarget::Youtube(id) => embed_url(VideoKind::Youtube, &id),
        UrlTarget::Vimeo(id) => embed_url(VideoKind::Vimeo, &id),
        UrlTarget::Wistia(id) => embed_url(VideoKind::Wistia, &id),
        UrlTarget::Media | UrlTarget::Other => None,
    };
    embed.unwrap_or_else(|| url.to_string())
}

/// Expand a bare id using an explicit provider hint or the id shape.
#[must_use]
pub fn expand_bare_id(id: &str, hint: &str) -> Option<String> {
    let hint = hint.to_lowercase();
    let kind = if hint.contains("youtube") || hint.contains("yt") {
        VideoKind::Youtube
    } else if hint.contains("vimeo") {
        VideoKind::Vimeo
    } else if hint.contains("wistia") {
        VideoKind::Wistia
    } else if VIMEO_ID.is_match(id) {
        VideoKind::Vimeo
    } else if YOUTUBE_ID.is_match(id) {
        VideoKind::Youtube
    } else if WISTIA_ID.is_match(id) {
        VideoKind::Wistia
    } else {
        return None;
    };
    let valid = match kind {
        VideoKind::Youtube => YOUTUBE_ID.is_match(id),
        VideoKind::Vimeo => VIMEO_ID.is_match(id),
        _ => WISTIA_ID.is_match(id),
    };
    if valid {
        embed_url(kind, id)
    } else {
        None
    }
}

/// Everything discovered about the video(s) in one subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Ordered, de-duplicated, canonical source URLs.
    pub urls: Vec<String>,
    pub thumbnail: Option<String>,
    pub title: Option<String>,
    pub dimensions: Dimensions,
    pub flags: PlaybackFlags,
    seen: HashSet<String>,
}

impl Discovery {
    fn push(&mut self, url: &str, base: &Url) {
        let absolute = create_absolute_url(url, base);
        if !absolute.starts_with("http://") && !absolute.starts_with("https://") {
            return;
        }
        let canonical = canonicalize(&absolute);
        if self.seen.insert(canonical.clone()) {
            self.urls.push(canonical);
        }
    }

    fn set_thumbnail(&mut self, url: &str, base: &Url) {
        if self.thumbnail.is_none() {
            let absolute = create_absolute_url(url, base);
            if absolute.starts_with("http") {
                self.thumbnail = Some(absolute);
            }
        }
    }

    fn set_title(&mut self, title: Option<String>) {
        if self.title.is_none() {
            self.title = title.filter(|t| !t.trim().is_empty());
        }
    }

    fn set_dimensions(&mut self, el: &Selection) {
        if self.dimensions.width.is_none() && self.dimensions.height.is_none() {
            let parse = |name: &str| attr(el, name).trim_end_matches("px").parse::<u32>().ok();
            self.dimensions = Dimensions {
                width: parse("width"),
                height: parse("height"),
            };
        }
    }
}

/// Run every discovery strategy over `root` (root included).
#[must_use]
pub fn discover(root: &Selection, base: &Url) -> Discovery {
    let mut found = Discovery::default();
    native_videos(root, base, &mut found);
    host_iframes(root, base, &mut found);
    microdata(root, base, &mut found);
    data_attributes(root, base, &mut found);
    scripts_and_json(root, base, &mut found);
    found
}

/// Whether a subtree shows any sign of video content.
#[must_use]
pub fn has_video_evidence(root: &Selection) -> bool {
    if !dom::select_with_self(root, "video").is_empty() {
        return true;
    }
    let iframes = dom::select_with_self(root, "iframe");
    if iframes.iter().any(|f| is_video_host(&attr(f, "src")) || is_video_host(&attr(f, "data-src"))) {
        return true;
    }
    let all = dom::select_with_self(root, "*");
    if all.iter().any(|el| {
        VIDEO_DATA_ATTRIBUTES.iter().any(|name| el.has_attr(name))
            || matches!(attr(el, "itemprop").to_lowercase().as_str(), "contenturl" | "embedurl")
    }) {
        return true;
    }
    root.select("script").iter().any(|s| {
        let text = unescape_json_text(&s.text());
        MEDIA_FILE_URL.is_match(&text) || is_video_host(&text)
    })
}

fn live_flags(el: &Selection) -> PlaybackFlags {
    let live = attr(el, LIVE_FLAGS_ATTR).to_lowercase();
    let has = |name: &str| el.has_attr(name) || live.split_whitespace().any(|f| f == name);
    PlaybackFlags {
        controls: has("controls"),
        autoplay: has("autoplay"),
        looped: has("loop"),
        muted: has("muted"),
        plays_inline: has("playsinline"),
    }
}

fn native_videos(root: &Selection, base: &Url, found: &mut Discovery) {
    for (i, video) in dom::select_with_self(root, "video").iter().enumerate() {
        if i == 0 {
            found.flags = live_flags(video);
            found.set_dimensions(video);
        }
        for name in [CURRENT_SRC_ATTR, "src", "data-src"] {
            if let Some(src) = dom::non_empty_attribute(video, name) {
                found.push(&src, base);
            }
        }
        for source in video.select("source").iter() {
            for name in ["src", "data-src"] {
                if let Some(src) = dom::non_empty_attribute(&source, name) {
                    found.push(&src, base);
                }
            }
        }
        if let Some(poster) = dom::non_empty_attribute(video, "poster") {
            found.set_thumbnail(&poster, base);
        }
        found.set_title(dom::non_empty_attribute(video, "title").or_else(|| dom::non_empty_attribute(video, "aria-label")));
    }
}

fn host_iframes(root: &Selection, base: &Url, found: &mut Discovery) {
    for frame in dom::select_with_self(root, "iframe") {
        let src = dom::non_empty_attribute(&frame, "src")
            .filter(|s| is_video_host(s))
            .or_else(|| dom::non_empty_attribute(&frame, "data-src").filter(|s| is_video_host(s)));
        if let Some(src) = src {
            found.push(&src, base);
            found.set_dimensions(&frame);
            found.set_title(dom::non_empty_attribute(&frame, "title"));
        }
    }
}

fn microdata(root: &Selection, base: &Url, found: &mut Discovery) {
    for el in dom::select_with_self(root, "[itemprop]") {
        let value = dom::non_empty_attribute(&el, "content")
            .or_else(|| dom::non_empty_attribute(&el, "href"))
            .or_else(|| dom::non_empty_attribute(&el, "src"));
        let Some(value) = value else {
            continue;
        };
        match attr(&el, "itemprop").to_lowercase().as_str() {
            "contenturl" | "embedurl" => found.push(&value, base),
            "thumbnailurl" | "thumbnail" => found.set_thumbnail(&value, base),
            "name" => found.set_title(Some(value)),
            _ => {}
        }
    }
    for el in dom::select_with_self(root, "[thumbnail-url], [data-thumbnail-url]") {
        if let Some(thumb) = dom::non_empty_attribute(&el, "thumbnail-url")
            .or_else(|| dom::non_empty_attribute(&el, "data-thumbnail-url"))
        {
            found.set_thumbnail(&thumb, base);
        }
    }
}

fn provider_hint(el: &Selection, attribute: &str) -> String {
    let mut hint = attribute.to_string();
    for name in PROVIDER_ATTRIBUTES {
        if let Some(v) = dom::non_empty_attribute(el, name) {
            hint.push(' ');
            hint.push_str(&v);
        }
    }
    hint
}

fn data_attributes(root: &Selection, base: &Url, found: &mut Discovery) {
    for el in dom::select_with_self(root, "*") {
        for name in VIDEO_DATA_ATTRIBUTES {
            let Some(value) = dom::non_empty_attribute(&el, name) else {
                continue;
            };
            if value.contains('/') || value.contains('.') {
                found.push(&value, base);
            } else if let Some(url) = expand_bare_id(&value, &provider_hint(&el, name)) {
                found.push(&url, base);
            }
        }
        if tag(&el) == "img" && found.thumbnail.is_none() && el.has_attr("data-video-thumbnail") {
            if let Some(src) = dom::non_empty_attribute(&el, "src") {
                found.set_thumbnail(&src, base);
            }
        }
    }
}

/// Undo JSON escaping that hides URLs from the patterns.
#[must_use]
pub fn unescape_json_text(text: &str) -> String {
    text.replace("\\/", "/")
        .replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\u0026", "&")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Scan free text for video URLs in pattern order.
pub fn scan_text(text: &str, base: &Url, found: &mut Discovery) {
    let text = unescape_json_text(text);
    for m in MEDIA_FILE_URL.find_iter(&text) {
        found.push(m.as_str(), base);
    }
    for caps in YOUTUBE_URL.captures_iter(&text) {
        if let Some(url) = caps.get(1).and_then(|id| embed_url(VideoKind::Youtube, id.as_str())) {
            found.push(&url, base);
        }
    }
    for caps in VIMEO_URL.captures_iter(&text) {
        if let Some(url) = caps.get(1).and_then(|id| embed_url(VideoKind::Vimeo, id.as_str())) {
            found.push(&url, base);
        }
    }
    for caps in WISTIA_URL.captures_iter(&text) {
        if let Some(url) = caps.get(1).and_then(|id| embed_url(VideoKind::Wistia, id.as_str())) {
            found.push(&url, base);
        }
    }
    if let Some(thumb) = capture_1(&JSON_THUMBNAIL, &text) {
        found.set_thumbnail(&thumb, base);
    }
}

fn scripts_and_json(root: &Selection, base: &Url, found: &mut Discovery) {
    for script in dom::select_with_self(root, "script") {
        scan_text(&script.text(), base, found);
    }
    for el in dom::select_with_self(root, "*") {
        for (_, value) in dom::get_all_attributes(&el) {
            let trimmed = value.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                scan_text(&value, base, found);
            }
        }
    }
}
