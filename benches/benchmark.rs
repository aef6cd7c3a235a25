//! Offline reconstruction benchmarks.
//!
//! Run with: `cargo bench`
//!
//! - a small storefront page for the full DOM pipeline
//! - generated grids of growing size for product card scoring
//! - index build and query over the generated catalog

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use page_replica::search::{IndexDocument, SearchIndex};
use page_replica::{reconstruct_html, Options};

const URL: &str = "https://store.example.com/collections/all";

const STOREFRONT_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Example Store</title>
    <meta name="description" content="Tees, hoodies and mugs.">
    <script src="https://cdn.shopify.com/s/files/1/theme.js"></script>
    <script src="https://www.googletagmanager.com/gtag/js?id=G-1"></script>
</head>
<body>
    <header class="site-header">
        <form action="/search" class="search-form"><input type="search" name="q" placeholder="Search"></form>
        <form class="newsletter"><input type="email" name="email" placeholder="Subscribe"></form>
    </header>
    <section class="hero-banner">
        <h1>Winter sale</h1>
        <img src="/img/hero.jpg" alt="">
        <a class="button" href="/collections/sale">Shop now</a>
    </section>
    <div class="yotpo-video-carousel">
        <div class="keen-slider__slide"><video src="/media/a.mp4" poster="/media/a.jpg"></video></div>
        <div class="keen-slider__slide"><video src="/media/b.mp4"></video></div>
    </div>
    <iframe src="https://player.vimeo.com/video/76979871" width="640" height="360"></iframe>
    <div id="onetrust-consent-sdk"><p>Cookies</p></div>
</body>
</html>
"#;

fn product_grid(cards: usize) -> String {
    let mut html = String::from("<html><head><title>Grid</title></head><body><ul class=\"product-grid\">");
    for i in 0..cards {
        html.push_str(&format!(
            "<li class=\"card\"><a href=\"/products/item-{i}\"><img src=\"/img/{i}.jpg\"></a>\
             <h3>Item {i}</h3><span class=\"price\">${i}.00</span><button>Add to cart</button></li>"
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

fn bench_storefront(c: &mut Criterion) {
    let options = Options::default();
    c.bench_function("reconstruct_storefront", |b| {
        b.iter(|| reconstruct_html(black_box(STOREFRONT_HTML), URL, black_box(&options)));
    });
}

fn bench_product_grids(c: &mut Criterion) {
    let options = Options::default();
    let mut group = c.benchmark_group("product_grid");
    for cards in [12, 48, 192] {
        let html = product_grid(cards);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::new("reconstruct", cards), &html, |b, html| {
            b.iter(|| reconstruct_html(black_box(html), URL, &options));
        });
    }
    group.finish();
}

fn bench_index(c: &mut Criterion) {
    let documents: Vec<IndexDocument> = (0..500)
        .map(|i| IndexDocument {
            id: i,
            title: format!("Organic cotton tee {i}"),
            description: format!("Soft heavyweight jersey in colorway {i}"),
            url: Some(format!("{URL}/products/tee-{i}")),
            image: None,
            price: Some(format!("${i}.00")),
        })
        .collect();

    c.bench_function("index_build_500", |b| {
        b.iter(|| SearchIndex::build(black_box(documents.clone())));
    });

    let index = SearchIndex::build(documents);
    c.bench_function("index_query_fuzzy", |b| {
        b.iter(|| index.query(black_box("heavywieght cottn"), 8).len());
    });
}

criterion_group!(benches, bench_storefront, bench_product_grids, bench_index);
criterion_main!(benches);
