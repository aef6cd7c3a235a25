use page_replica::{reconstruct_bytes, reconstruct_html, BlockType, Error, Options, SearchOptions, SearchOverride, VideoKind};

const URL: &str = "https://brand.example.com/collections/all";

fn rebuild(html: &str) -> page_replica::Reconstruction {
    match reconstruct_html(html, URL, &Options::default()) {
        Ok(r) => r,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    }
}

fn plain_card(name: &str) -> String {
    format!(r#"<div class="card"><img src="/{name}.jpg" alt=""><h3>{name}</h3><span>$18.00</span></div>"#)
}

fn buyable_card(name: &str) -> String {
    format!(
        r#"<div class="card"><img src="/{name}.jpg" alt=""><h3>{name}</h3><span>$32.00</span><button type="button">Add to cart</button></div>"#
    )
}

#[test]
fn five_card_grid_keeps_two_cards() {
    let html = format!(
        "<html><head><title>All</title></head><body><section class=\"collection\">{}{}{}{}{}</section></body></html>",
        plain_card("Socks"),
        buyable_card("Tee"),
        plain_card("Cap"),
        buyable_card("Hoodie"),
        plain_card("Scarf"),
    );
    let replica = rebuild(&html);
    let products = &replica.metadata.products;

    assert_eq!(products.len(), 2);
    assert!(products.iter().all(|p| p.score == 4 && !p.assets.is_empty()));
    let titles: Vec<&str> = products.iter().filter_map(|p| p.title.as_deref()).collect();
    assert_eq!(titles, vec!["Tee", "Hoodie"]);

    let indexed: Vec<&str> = replica.index.documents.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(indexed, vec!["Tee", "Hoodie"]);
}

#[test]
fn only_the_search_input_becomes_the_descriptor() {
    let replica = rebuild(
        r#"<html><body>
          <div class="newsletter"><input type="text" name="newsletter_email" placeholder="Subscribe for 10% off"></div>
          <div class="site-search"><input type="text" name="q" placeholder="Search products"></div>
        </body></html>"#,
    );

    let search = match &replica.metadata.search {
        Some(s) => s,
        None => panic!("search descriptor missing"),
    };
    assert!(search.input_markup.contains("Search products"));
    assert!(!search.input_markup.contains("Subscribe"));
    assert_eq!(search.form_action, "https://brand.example.com/search");
    assert_eq!(search.param, "q");

    let search_blocks: Vec<_> = replica
        .metadata
        .blocks
        .iter()
        .filter(|b| b.block_type == BlockType::SearchBlock)
        .collect();
    assert_eq!(search_blocks.len(), 1);
    for id in &search_blocks[0].assets {
        let asset = &replica.metadata.assets[*id];
        assert!(!asset.attr("name").contains("email"));
    }
}

#[test]
fn widget_without_urls_renders_diagnostic_placeholder() {
    let replica = rebuild(
        r#"<html><body><div class="tolstoy-stories"><div class="tile"><span>Watch the story</span></div></div></body></html>"#,
    );
    let videos = &replica.metadata.videos;
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].kind, VideoKind::Widget);
    assert!(videos[0].source_urls.is_empty());

    assert!(replica.html.contains("pe-video-placeholder"));
    assert!(!replica.html.contains("data-pe-video=\""));
}

#[test]
fn every_marker_is_consumed() {
    let replica = rebuild(
        r#"<html><body>
          <video src="/media/one.mp4" autoplay muted loop playsinline></video>
          <iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe>
          <iframe src="https://player.vimeo.com/video/76979871"></iframe>
          <div class="keen-slider">
            <div class="keen-slider__slide"><video data-src="/media/two.mp4"></video></div>
            <div class="keen-slider__slide"><video data-src="/media/three.mp4"></video></div>
          </div>
        </body></html>"#,
    );
    let videos = &replica.metadata.videos;
    assert_eq!(videos.len(), 5);
    for (i, record) in videos.iter().enumerate() {
        assert_eq!(record.index, i);
    }
    assert!(!replica.html.contains("data-pe-video=\""));
    assert!(replica.html.contains("https://brand.example.com/media/one.mp4"));
    assert!(replica.html.contains("https://brand.example.com/media/three.mp4"));
}

#[test]
fn only_first_hero_survives() {
    let replica = rebuild(
        r#"<html><body>
          <section class="hero"><h1>Spring</h1><img src="/a.jpg"><button>Shop</button></section>
          <section class="promo"><h2>Summer</h2><img src="/b.jpg"><button>Shop</button></section>
          <section class="hero-2"><h2>Fall</h2><img src="/c.jpg"><button>Shop</button></section>
        </body></html>"#,
    );
    let heroes = replica
        .metadata
        .blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Hero)
        .count();
    assert_eq!(heroes, 1);
    assert_eq!(replica.metadata.blocks[0].block_type, BlockType::Hero);
}

#[test]
fn third_party_chrome_and_trackers_are_removed() {
    let replica = rebuild(
        r#"<html><head><script src="https://www.googletagmanager.com/gtm.js?id=GTM-1"></script>
          <script type="application/ld+json">{"@type":"Organization","name":"Brand"}</script></head>
          <body onload="track()">
            <div id="onetrust-consent-sdk"><p>We use cookies</p></div>
            <a href="/about" onclick="track()">About</a>
            <img src="/logo.png">
          </body></html>"#,
    );
    let html = &replica.html;
    assert!(!html.contains("googletagmanager"));
    assert!(!html.contains("onetrust"));
    assert!(!html.contains("onclick"));
    assert!(html.contains("application/ld+json"));
    assert!(html.contains(r#"href="https://brand.example.com/about""#));
    assert!(html.contains(r#"src="https://brand.example.com/logo.png""#));
}

#[test]
fn page_document_indexed_without_cards() {
    let replica = rebuild(
        r#"<html><head><title>About Brand</title><meta name="description" content="Small-batch ceramics from Lisbon"></head>
        <body><h1>About</h1></body></html>"#,
    );
    let hits = replica.index.query("About Brand", 8);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.url.as_deref(), Some(URL));
    assert!(replica.index.contains_term("lisbon"));
}

#[test]
fn search_fallback_script_is_injected() {
    let replica = rebuild(r#"<html><body><input type="search" name="q"></body></html>"#);
    assert!(replica.html.contains("data-pe-search-fallback"));
    assert!(replica.html.contains("https://brand.example.com/search"));
    assert!(replica.html.contains("<form"));
}

#[test]
fn bytes_are_decoded_before_parsing() {
    let html = b"<html><head><meta charset=\"iso-8859-1\"><title>Cr\xE8me br\xFBl\xE9e</title></head><body></body></html>";
    let replica = match reconstruct_bytes(html, None, URL, &Options::default()) {
        Ok(r) => r,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    };
    assert_eq!(replica.metadata.title.as_deref(), Some("Crème brûlée"));
    assert!(replica.index.contains_term("creme"));
}

#[test]
fn relative_urls_are_rejected() {
    let result = reconstruct_html("<html></html>", "/collections/all", &Options::default());
    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}

#[test]
fn written_replica_references_its_index() {
    let dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => panic!("tempdir: {e}"),
    };
    let replica = rebuild(&format!("<html><body><section>{}{}</section></body></html>", buyable_card("Tee"), buyable_card("Mug")));
    let paths = match replica.write(dir.path(), "brand-all", None) {
        Ok(p) => p,
        Err(e) => panic!("write: {e}"),
    };
    let html = std::fs::read_to_string(&paths.html).unwrap_or_default();
    assert!(html.contains(r#"src="pe-search.js""#));
    assert!(html.contains(r#"data-index="brand-all-search-index.json""#));
    assert!(html.contains(r#"data-max="8""#));
    assert!(paths.screenshot.is_none());
    assert!(paths.script.exists());
}

#[test]
fn query_script_follows_domain_override_and_result_cap() {
    let options = Options {
        search: SearchOptions {
            overrides: vec![SearchOverride {
                domain: "brand.example.com".to_string(),
                path: "/find".to_string(),
                param: "keyword".to_string(),
            }],
            max_results: 5,
            ..SearchOptions::default()
        },
        ..Options::default()
    };
    let replica = match reconstruct_html(r#"<html><body><input type="search" name="q"></body></html>"#, URL, &options) {
        Ok(r) => r,
        Err(err) => panic!("expected Ok(_), got Err({err:?})"),
    };
    let dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => panic!("tempdir: {e}"),
    };
    let paths = match replica.write(dir.path(), "brand-find", None) {
        Ok(p) => p,
        Err(e) => panic!("write: {e}"),
    };
    let html = std::fs::read_to_string(&paths.html).unwrap_or_default();
    assert!(html.contains(r#"data-param="keyword""#));
    assert!(html.contains(r#"data-max="5""#));
    assert!(html.contains(r#"name="keyword""#));
}
