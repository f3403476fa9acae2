use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::snapshot::{
    self, page::Page, retry::FALLBACK_NAME, ExtractOptions, Extractor, PageSource, RawPage,
    RetryPolicy, StaticPageSource,
};

fn extractor() -> Extractor {
    Extractor::new(
        ExtractOptions::default(),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            step: Duration::ZERO,
        },
    )
}

fn scan(url: &str, html: &str) -> snapshot::ProductSnapshot {
    let page = Page::parse(&RawPage::new(url, html));
    let snap = extractor().scan(&page).unwrap().0;
    assert!(snap.is_usable());
    snap
}

#[test]
pub fn test_structured_data_page() {
    let html = r#"<html><head>
        <script type="application/ld+json">
        {"@type":"Product","name":"Classic Tee","brand":"Acme","offers":{"price":"25.00"},"image":"https://x.com/a.jpg"}
        </script>
        <meta property="og:image" content="https://x.com/og.jpg">
        </head><body><h1>Some other heading</h1></body></html>"#;

    let snap = scan("https://www.acme.com/tee", html);
    assert_eq!(snap.name, "Classic Tee");
    assert_eq!(snap.brand.as_deref(), Some("Acme"));
    assert_eq!(snap.price.as_deref(), Some("$25.00"));
    assert_eq!(snap.image_urls[0], "https://x.com/a.jpg");
    assert_eq!(snap.retailer_domain, "acme.com");
}

#[test]
pub fn test_dom_only_page() {
    let html = r#"<html><head><title>Widget | Shop</title></head><body>
        <main>
          <h1>Widget</h1>
          <img class="product-main" src="/img/widget.jpg" width="200" height="200">
          <img src="/img/icon.png" width="20" height="20">
          <p>$19.99</p>
        </main></body></html>"#;

    let snap = scan("https://shop.com/widget", html);
    assert_eq!(snap.name, "Widget");
    assert_eq!(snap.price.as_deref(), Some("$19.99"));
    assert_eq!(snap.image_urls, vec!["https://shop.com/img/widget.jpg"]);
}

#[test]
pub fn test_strikethrough_price_never_chosen() {
    let html = r#"<html><body><main>
        <h1>Boot</h1>
        <img class="product-main" src="/boot.jpg" width="400" height="400">
        <del class="price">$120.00</del>
        <span class="price">$89.00</span>
        </main></body></html>"#;

    let snap = scan("https://shop.com/boot", html);
    assert_eq!(snap.price.as_deref(), Some("$89.00"));
}

#[test]
pub fn test_struck_price_inside_price_container() {
    let html = r#"<html><body><main>
        <h1>Boot</h1>
        <img class="product-main" src="/boot.jpg" width="400" height="400">
        <div class="price-box"><del>$120.00</del><span class="sale">$89.00</span></div>
        </main></body></html>"#;

    let snap = scan("https://shop.com/boot", html);
    assert_eq!(snap.price.as_deref(), Some("$89.00"));
}

#[test]
pub fn test_image_list_is_clean() {
    let mut imgs = String::new();
    for i in 0..8 {
        imgs.push_str(&format!(
            r#"<img src="/g{i}.jpg" width="{w}" height="300">"#,
            w = 300 + i * 10
        ));
    }
    let html = format!(
        r#"<html><head>
        <meta property="og:image" content="/g0.jpg">
        </head><body><h1>Coat</h1>
        <img src="data:image/png;base64,AAAA" width="900" height="900">
        <img src="/logo.svg" width="900" height="900">
        <img src="/LOGO.SVG" width="900" height="900">
        {imgs}
        <img src="/g0.jpg" width="1000" height="1000">
        </body></html>"#
    );

    let snap = scan("https://shop.com/coat", &html);
    assert!(snap.image_urls.len() <= 5);
    assert!(!snap.image_urls.is_empty());
    assert_eq!(snap.image_urls[0], "https://shop.com/g0.jpg");

    let mut seen = std::collections::HashSet::new();
    for url in &snap.image_urls {
        assert!(seen.insert(url), "duplicate {url}");
        assert!(!url.starts_with("data:"));
        assert!(!url.to_lowercase().ends_with(".svg"));
    }
}

#[test]
pub fn test_page_without_images_is_rejected() {
    let page = Page::parse(&RawPage::new(
        "https://shop.com/p",
        "<html><body><h1>Nothing</h1></body></html>",
    ));
    assert!(extractor().scan(&page).is_err());
}

struct Unusable {
    loads: AtomicU32,
}

impl PageSource for Unusable {
    fn url(&self) -> &str {
        "https://www.boutique.net/item/1"
    }

    fn load(&self) -> anyhow::Result<RawPage> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(RawPage::new(
            self.url(),
            "<html><head><title>Loading</title></head><body></body></html>",
        ))
    }
}

#[test]
pub fn test_fallback_after_three_failures() {
    let source = Unusable {
        loads: AtomicU32::new(0),
    };
    let extraction = snapshot::extract_snapshot(&extractor(), &source, None);

    assert!(extraction.fell_back);
    assert_eq!(extraction.attempts, 3);
    assert_eq!(source.loads.load(Ordering::SeqCst), 3);
    assert!(extraction.report.is_none());

    let snap = extraction.snapshot;
    assert_eq!(snap.name, "Loading");
    assert_eq!(snap.retailer_domain, "boutique.net");
    assert_eq!(snap.brand.as_deref(), Some("Boutique"));
    assert!(snap.image_urls.is_empty());
    assert!(snap.price.is_none());
}

#[test]
pub fn test_fallback_name_without_title() {
    let source = StaticPageSource::new(RawPage::new("https://shop.com/p", "<html></html>"));
    let extraction = snapshot::extract_snapshot(&extractor(), &source, None);
    assert!(extraction.fell_back);
    assert_eq!(extraction.snapshot.name, FALLBACK_NAME);
}

#[test]
pub fn test_report_names_winners() {
    let html = r#"<html><head>
        <meta property="og:site_name" content="Shop">
        </head><body><h1>Lamp</h1>
        <img class="product-main" src="/lamp.jpg" width="300" height="300">
        <span class="price">$45.00</span></body></html>"#;
    let source = StaticPageSource::new(RawPage::new("https://shop.com/lamp", html));
    let extraction = extractor().run(&source);

    let report = extraction.report.unwrap();
    let winner = |field: &str| {
        report
            .field_decisions
            .iter()
            .find(|d| d.field == field)
            .map(|d| d.winner.clone())
    };
    assert_eq!(winner("name").as_deref(), Some("h1"));
    assert_eq!(winner("brand").as_deref(), Some("og:site_name"));
    assert_eq!(winner("price").as_deref(), Some("dom"));
    assert!(report.collectors.iter().any(|c| c.name == "visual" && c.images == 1));
}
