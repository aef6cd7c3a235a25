//! Video Reconstructor
//!
//! Replaces every placeholder-marked element with one self-contained
//! rendering, chosen by evidence priority:
//!
//! 1. `<video>` re-assembly when direct media URLs exist
//! 2. a responsive iframe for YouTube, Vimeo or Wistia
//! 3. the thumbnail with a play overlay
//! 4. a labeled diagnostic placeholder carrying the escaped markup sample
//!
//! Replacement is keyed on the record index only. A record with no marker is
//! skipped; markers with no record are stripped afterwards.

use dom_query::Document;
use tracing::debug;

use crate::dom::{self, escape_html};
use crate::result::{VideoKind, VideoRecord};
use crate::video::sources::{classify_url, embed_url, UrlTarget};
use crate::video::{marker_selector, MARKER_ATTR};

/// Outcome of a reconstruction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconstructReport {
    /// Indices that were replaced.
    pub replaced: Vec<usize>,
    /// Indices without a marker in the document.
    pub skipped: Vec<usize>,
    /// Markers with no matching record, stripped.
    pub orphaned_markers: usize,
}

/// Swap every marker for its rendering.
pub fn reconstruct_videos(doc: &Document, records: &[VideoRecord]) -> ReconstructReport {
    let mut report = ReconstructReport::default();

    for record in records {
        let target = doc.select(&marker_selector(record.index));
        if !target.exists() {
            debug!(index = record.index, "no marker for video record");
            report.skipped.push(record.index);
            continue;
        }
        dom::replace_with_html(&target.first(), &render_record(record));
        report.replaced.push(record.index);
    }

    let leftovers = doc.select(&format!("[{MARKER_ATTR}]"));
    report.orphaned_markers = leftovers.length();
    leftovers.remove_attr(MARKER_ATTR);

    report
}

/// Markup that replaces one record's marked element.
#[must_use]
pub fn render_record(record: &VideoRecord) -> String {
    let media: Vec<&str> = record
        .source_urls
        .iter()
        .map(String::as_str)
        .filter(|u| is_media(u, record.kind))
        .collect();
    if !media.is_empty() {
        return render_native(record, &media);
    }

    let embed = record.source_urls.iter().find_map(|u| match classify_url(u) {
        UrlTarget::Youtube(id) => embed_url(VideoKind::Youtube, &id),
        UrlTarget::Vimeo(id) => embed_url(VideoKind::Vimeo, &id),
        UrlTarget::Wistia(id) => embed_url(VideoKind::Wistia, &id),
        UrlTarget::Media | UrlTarget::Other => None,
    });
    if let Some(src) = embed {
        return render_embed(record, &src);
    }

    if let Some(thumb) = &record.thumbnail_url {
        return render_thumbnail(record, thumb);
    }

    render_diagnostic(record)
}

fn is_media(url: &str, kind: VideoKind) -> bool {
    match classify_url(url) {
        UrlTarget::Media => true,
        UrlTarget::Other => kind == VideoKind::Html5,
        _ => false,
    }
}

fn media_type(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    let ext = path.rsplit('.').next().unwrap_or_default();
    match ext {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "ogv" => Some("video/ogg"),
        "mov" => Some("video/quicktime"),
        "m3u8" => Some("application/vnd.apple.mpegurl"),
        _ => None,
    }
}

fn size_attrs(record: &VideoRecord) -> String {
    let mut out = String::new();
    if let Some(w) = record.dimensions.width {
        out.push_str(&format!(" width=\"{w}\""));
    }
    if let Some(h) = record.dimensions.height {
        out.push_str(&format!(" height=\"{h}\""));
    }
    out
}

fn render_native(record: &VideoRecord, media: &[&str]) -> String {
    let flags = record.flags;
    let mut attrs = String::new();
    // A video with neither controls nor autoplay could never start.
    if flags.controls || !flags.autoplay {
        attrs.push_str(" controls");
    }
    if flags.autoplay {
        attrs.push_str(" autoplay");
    }
    if flags.looped {
        attrs.push_str(" loop");
    }
    if flags.muted || flags.autoplay {
        attrs.push_str(" muted");
    }
    if flags.plays_inline || flags.autoplay {
        attrs.push_str(" playsinline");
    }
    if let Some(poster) = &record.thumbnail_url {
        attrs.push_str(&format!(" poster=\"{}\"", escape_html(poster)));
    }
    if let Some(title) = &record.title {
        attrs.push_str(&format!(" title=\"{}\"", escape_html(title)));
    }

    let sources: String = media
        .iter()
        .map(|url| match media_type(url) {
            Some(t) => format!("<source src=\"{}\" type=\"{t}\">", escape_html(url)),
            None => format!("<source src=\"{}\">", escape_html(url)),
        })
        .collect();

    format!(
        "<video class=\"pe-video\" data-pe-video-kind=\"{}\" preload=\"metadata\" style=\"max-width:100%;height:auto\"{}{attrs}>{sources}</video>",
        record.kind,
        size_attrs(record)
    )
}

fn aspect_padding(record: &VideoRecord) -> String {
    match (record.dimensions.width, record.dimensions.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => format!("{:.4}%", f64::from(h) * 100.0 / f64::from(w)),
        _ => "56.25%".to_string(),
    }
}

fn render_embed(record: &VideoRecord, src: &str) -> String {
    let title = record.title.as_deref().unwrap_or("Embedded video");
    format!(
        "<div class=\"pe-video-embed\" data-pe-video-kind=\"{}\" style=\"position:relative;width:100%;padding-top:{};\">\
<iframe src=\"{}\" title=\"{}\" style=\"position:absolute;top:0;left:0;width:100%;height:100%;border:0\" \
allow=\"autoplay; fullscreen; picture-in-picture; encrypted-media\" allowfullscreen loading=\"lazy\"></iframe></div>",
        record.kind,
        aspect_padding(record),
        escape_html(src),
        escape_html(title)
    )
}

fn render_thumbnail(record: &VideoRecord, thumb: &str) -> String {
    let alt = record.title.as_deref().unwrap_or("Video");
    let inner = format!(
        "<img src=\"{}\" alt=\"{}\" loading=\"lazy\" style=\"display:block;width:100%;height:auto\">\
<span class=\"pe-video-play\" aria-hidden=\"true\" style=\"position:absolute;top:50%;left:50%;transform:translate(-50%,-50%);\
width:64px;height:64px;border-radius:50%;background:rgba(0,0,0,.6);color:#fff;font-size:28px;line-height:64px;text-align:center\">&#9654;</span>",
        escape_html(thumb),
        escape_html(alt)
    );
    let style = "position:relative;display:inline-block;max-width:100%";
    match record.source_urls.first() {
        Some(link) => format!(
            "<a class=\"pe-video-thumb\" data-pe-video-kind=\"{}\" href=\"{}\" target=\"_blank\" rel=\"noopener\" style=\"{style}\">{inner}</a>",
            record.kind,
            escape_html(link)
        ),
        None => format!(
            "<div class=\"pe-video-thumb\" data-pe-video-kind=\"{}\" style=\"{style}\">{inner}</div>",
            record.kind
        ),
    }
}

fn render_diagnostic(record: &VideoRecord) -> String {
    format!(
        "<div class=\"pe-video-placeholder\" data-pe-video-kind=\"{kind}\" role=\"img\" aria-label=\"Video unavailable\" \
style=\"border:2px dashed #999;padding:16px;margin:8px 0;background:#f6f6f6;color:#333;font:14px/1.4 sans-serif\">\
<strong>Video unavailable</strong> <small>({kind} #{index})</small>\
<details><summary>Captured markup</summary><pre style=\"white-space:pre-wrap;font-size:12px\">{sample}</pre></details></div>",
        kind = record.kind,
        index = record.index,
        sample = escape_html(&record.markup_sample)
    )
}
