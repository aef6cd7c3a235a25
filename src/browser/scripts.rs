//! Page-side scripts evaluated through the driver.
//!
//! Every script is a self-invoking expression returning JSON-serializable
//! data, so any `PageDriver` can run it with `evaluate`.

/// Attribute stamped on elements whose open shadow root was materialized.
pub const SHADOW_HOST_ATTR: &str = "data-pe-shadow-host";

/// Attribute on the light-DOM copy of a shadow root.
pub const SHADOW_ROOT_ATTR: &str = "data-pe-shadow-root";

/// Installs a document-wide mutation counter. Idempotent.
pub const INSTALL_MUTATION_COUNTER: &str = r#"(() => {
  if (window.__peStability) { return true; }
  const state = { count: 0, last: performance.now() };
  window.__peStability = state;
  const observer = new MutationObserver((records) => {
    state.count += records.length;
    state.last = performance.now();
  });
  observer.observe(document.documentElement, {
    childList: true, subtree: true, attributes: true, characterData: true
  });
  return true;
})()"#;

/// Stability probe body. Call with a JSON array of widget selectors.
///
/// Returns `{mutations, quietMs, pendingWidgets}`.
const STABILITY_PROBE: &str = r#"((widgets) => {
  const state = window.__peStability || { count: 0, last: 0 };
  const pending = [];
  for (const sel of widgets) {
    let nodes = [];
    try { nodes = Array.from(document.querySelectorAll(sel)); } catch (e) { continue; }
    if (nodes.length === 0) { continue; }
    const mounted = nodes.some((n) => n.childElementCount > 0 || (n.shadowRoot && n.shadowRoot.childElementCount > 0));
    if (!mounted) { pending.push(sel); }
  }
  return {
    mutations: state.count,
    quietMs: Math.max(0, Math.round(performance.now() - state.last)),
    pendingWidgets: pending
  };
})"#;

/// One lazy-load scroll step. Returns `{y, height, atBottom}`.
pub const SCROLL_STEP: &str = r#"(() => {
  window.scrollBy(0, Math.max(window.innerHeight, 400));
  const y = Math.round(window.scrollY + window.innerHeight);
  const height = Math.round(document.documentElement.scrollHeight);
  return { y, height, atBottom: y >= height - 2 };
})()"#;

/// Scroll back to the top before the screenshot and snapshot.
pub const SCROLL_TO_TOP: &str = "(() => { window.scrollTo(0, 0); return true; })()";

/// Copies open shadow roots into light-DOM children and stamps live video
/// state onto `<video>` elements. Nested roots are materialized inside-out so
/// each copy already carries its descendants. Returns `{shadowRoots, videos}`.
pub const SNAPSHOT_PREP: &str = r#"(() => {
  let shadowRoots = 0;
  let videos = 0;
  const stamp = (root) => {
    for (const video of root.querySelectorAll('video')) {
      if (video.hasAttribute('data-pe-flags')) { continue; }
      if (video.currentSrc) { video.setAttribute('data-pe-current-src', video.currentSrc); }
      const flags = [];
      if (video.controls) flags.push('controls');
      if (video.autoplay) flags.push('autoplay');
      if (video.loop) flags.push('loop');
      if (video.muted) flags.push('muted');
      if (video.playsInline) flags.push('playsinline');
      video.setAttribute('data-pe-flags', flags.join(' '));
      videos += 1;
    }
  };
  const materialize = (root) => {
    for (const host of root.querySelectorAll('*')) {
      const shadow = host.shadowRoot;
      if (!shadow || host.hasAttribute('data-pe-shadow-host')) { continue; }
      materialize(shadow);
      stamp(shadow);
      host.setAttribute('data-pe-shadow-host', '');
      const copy = document.createElement('div');
      copy.setAttribute('data-pe-shadow-root', '');
      copy.innerHTML = shadow.innerHTML;
      host.appendChild(copy);
      shadowRoots += 1;
    }
  };
  stamp(document);
  materialize(document);
  return { shadowRoots, videos };
})()"#;

/// Document title of the live page.
pub const DOCUMENT_TITLE: &str = "document.title";

/// Stability probe invocation for the given widget selectors.
#[must_use]
pub fn stability_probe(widget_selectors: &[String]) -> String {
    let list = serde_json::to_string(widget_selectors).unwrap_or_else(|_| "[]".to_string());
    format!("{STABILITY_PROBE}({list})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_embeds_selectors_as_json() {
        let script = stability_probe(&[".yotpo-main-widget".to_string(), "[class*='x']".to_string()]);
        assert!(script.ends_with(r#"([".yotpo-main-widget","[class*='x']"])"#));
    }

    #[test]
    fn snapshot_prep_uses_pipeline_attributes() {
        assert!(SNAPSHOT_PREP.contains(SHADOW_HOST_ATTR));
        assert!(SNAPSHOT_PREP.contains(SHADOW_ROOT_ATTR));
        assert!(SNAPSHOT_PREP.contains(crate::video::sources::CURRENT_SRC_ATTR));
        assert!(SNAPSHOT_PREP.contains(crate::video::sources::LIVE_FLAGS_ATTR));
    }

    #[test]
    fn nested_shadow_roots_are_materialized_before_copying() {
        let recurse = SNAPSHOT_PREP.find("materialize(shadow)");
        let copy = SNAPSHOT_PREP.find("copy.innerHTML = shadow.innerHTML");
        assert!(recurse.is_some() && copy.is_some());
        assert!(recurse < copy);
        let stamp = SNAPSHOT_PREP.find("stamp(shadow)");
        assert!(stamp.is_some() && stamp < copy);
    }
}
