//! Turns the collectors' candidates into one product record.

use std::collections::HashSet;

use thiserror::Error;

use crate::snapshot::normalize::{normalize_brand, normalize_price, retailer_domain};
use crate::snapshot::page::{clean_text, Page};
use crate::snapshot::types::{
    CandidateSource, Candidates, ExtractOptions, FieldDecision, ImageCandidate, ProductSnapshot,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no product name found")]
    MissingName,
    #[error("no usable product image found")]
    MissingImages,
}

/// First candidate with non-blank text, labelled with where it came from.
fn first_present<'a>(
    options: &[(&'static str, Option<&'a String>)],
) -> Option<(&'static str, &'a str)> {
    options.iter().find_map(|(label, value)| {
        value
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| (*label, v))
    })
}

fn decision(field: &str, winner: &str, value: Option<&str>) -> FieldDecision {
    FieldDecision {
        field: field.to_string(),
        winner: winner.to_string(),
        value_preview: value.map(|v| v.chars().take(80).collect()),
    }
}

/// Resolve name, brand, price and images by fixed precedence.
///
/// Fails when either the name or the image list comes out empty; no partial
/// record is ever returned.
pub fn resolve(
    page: &Page,
    c: &Candidates,
    opts: &ExtractOptions,
) -> Result<(ProductSnapshot, Vec<FieldDecision>), ResolveError> {
    let mut decisions = Vec::new();
    let domain = retailer_domain(&page.url);

    let name = first_present(&[
        ("ld+json", c.structured.name.as_ref()),
        ("h1", c.heading.as_ref()),
        ("og:title", c.meta.title.as_ref()),
        ("title", c.document_title.as_ref()),
    ]);
    let Some((winner, name)) = name else {
        return Err(ResolveError::MissingName);
    };
    let name = clean_text(name);
    decisions.push(decision("name", winner, Some(name.as_str())));

    let brand = first_present(&[
        ("ld+json", c.structured.brand.as_ref()),
        ("og:site_name", c.meta.site_name.as_ref()),
        ("meta brand", c.meta.brand.as_ref()),
        ("domain", Some(&domain)),
    ])
    .and_then(|(winner, raw)| normalize_brand(raw).map(|b| (winner, b)));
    match &brand {
        Some((winner, b)) => decisions.push(decision("brand", winner, Some(b.as_str()))),
        None => decisions.push(decision("brand", "none", None)),
    }

    let price = first_present(&[
        ("ld+json", c.structured.price.as_ref()),
        ("meta price", c.meta.price.as_ref()),
        ("dom", c.dom_price.as_ref()),
    ])
    .map(|(winner, raw)| (winner, normalize_price(raw, &opts.default_currency)));
    match &price {
        Some((winner, Some(p))) => decisions.push(decision("price", winner, Some(p.as_str()))),
        Some((winner, None)) => decisions.push(decision("price", &format!("{winner} (rejected)"), None)),
        None => decisions.push(decision("price", "none", None)),
    }

    let images = rank_images(page, &c.images, opts.max_images);
    if images.is_empty() {
        return Err(ResolveError::MissingImages);
    }
    decisions.push(decision(
        "images",
        &format!("{} of {} candidates", images.len(), c.images.len()),
        images.first().map(String::as_str),
    ));

    let snapshot = ProductSnapshot {
        url: page.url.clone(),
        retailer_domain: domain,
        name,
        brand: brand.map(|(_, b)| b),
        price: price.and_then(|(_, p)| p),
        image_urls: images,
        ..Default::default()
    };

    Ok((snapshot, decisions))
}

/// Best-first, absolute, unique image URLs without SVGs or inline data.
pub fn rank_images(page: &Page, candidates: &[ImageCandidate], limit: usize) -> Vec<String> {
    let mut sorted: Vec<&ImageCandidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| ImageCandidate::desirability(a, b));

    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for candidate in sorted {
        if images.len() >= limit {
            break;
        }
        if candidate.url.trim_start().to_lowercase().starts_with("data:") {
            continue;
        }
        let Some(url) = page.resolve(&candidate.url) else {
            log::debug!("unresolvable image url {:?}", candidate.url);
            continue;
        };
        if url.starts_with("data:") || url.to_lowercase().contains(".svg") {
            continue;
        }
        if seen.insert(url.clone()) {
            log::debug!(
                "image {url} kept ({}, score {})",
                source_label(candidate.source),
                candidate.score
            );
            images.push(url);
        }
    }

    images
}

fn source_label(source: CandidateSource) -> &'static str {
    match source {
        CandidateSource::Structured => "ld+json",
        CandidateSource::Meta => "og:image",
        CandidateSource::Dom => "dom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::page::RawPage;
    use crate::snapshot::types::{MetaFields, StructuredFields};

    fn page(url: &str) -> Page {
        Page::parse(&RawPage::new(url, "<html><body></body></html>"))
    }

    fn img(url: &str, score: f64, source: CandidateSource) -> ImageCandidate {
        ImageCandidate::new(url, score, source)
    }

    #[test]
    fn test_name_precedence() {
        let p = page("https://shop.com/p");
        let mut c = Candidates {
            heading: Some("Heading".into()),
            document_title: Some("Title | Shop".into()),
            meta: MetaFields {
                title: Some("OG".into()),
                ..Default::default()
            },
            images: vec![img("/a.jpg", 1.0, CandidateSource::Dom)],
            ..Default::default()
        };
        let (s, _) = resolve(&p, &c, &ExtractOptions::default()).unwrap();
        assert_eq!(s.name, "Heading");

        c.heading = Some("   ".into());
        let (s, _) = resolve(&p, &c, &ExtractOptions::default()).unwrap();
        assert_eq!(s.name, "OG");

        c.structured.name = Some("LD  Name".into());
        let (s, decisions) = resolve(&p, &c, &ExtractOptions::default()).unwrap();
        assert_eq!(s.name, "LD Name");
        assert_eq!(decisions[0].winner, "ld+json");
    }

    #[test]
    fn test_brand_falls_back_to_domain() {
        let p = page("https://www.acme-store.com/item/1");
        let c = Candidates {
            heading: Some("Shoe".into()),
            images: vec![img("/a.jpg", 1.0, CandidateSource::Dom)],
            ..Default::default()
        };
        let (s, _) = resolve(&p, &c, &ExtractOptions::default()).unwrap();
        assert_eq!(s.retailer_domain, "acme-store.com");
        assert_eq!(s.brand.as_deref(), Some("Acme Store"));
    }

    #[test]
    fn test_site_name_before_meta_brand() {
        let p = page("https://shop.com/p");
        let c = Candidates {
            heading: Some("Shoe".into()),
            meta: MetaFields {
                site_name: Some("SHOPCO".into()),
                brand: Some("@other".into()),
                ..Default::default()
            },
            images: vec![img("/a.jpg", 1.0, CandidateSource::Dom)],
            ..Default::default()
        };
        let (s, _) = resolve(&p, &c, &ExtractOptions::default()).unwrap();
        assert_eq!(s.brand.as_deref(), Some("Shopco"));
    }

    #[test]
    fn test_price_precedence_does_not_fall_through_on_bad_value() {
        let p = page("https://shop.com/p");
        let c = Candidates {
            heading: Some("Shoe".into()),
            structured: StructuredFields {
                price: Some("0.00".into()),
                ..Default::default()
            },
            dom_price: Some("$20.00".into()),
            images: vec![img("/a.jpg", 1.0, CandidateSource::Dom)],
            ..Default::default()
        };
        let (s, decisions) = resolve(&p, &c, &ExtractOptions::default()).unwrap();
        assert_eq!(s.price, None);
        assert!(decisions.iter().any(|d| d.field == "price" && d.winner == "ld+json (rejected)"));
    }

    #[test]
    fn test_bare_price_gets_default_symbol() {
        let p = page("https://shop.com/p");
        let c = Candidates {
            heading: Some("Shoe".into()),
            meta: MetaFields {
                price: Some("68.00".into()),
                ..Default::default()
            },
            images: vec![img("/a.jpg", 1.0, CandidateSource::Dom)],
            ..Default::default()
        };
        let opts = ExtractOptions {
            default_currency: "€".into(),
            ..Default::default()
        };
        let (s, _) = resolve(&p, &c, &opts).unwrap();
        assert_eq!(s.price.as_deref(), Some("€68.00"));
    }

    #[test]
    fn test_missing_name_and_images() {
        let p = page("https://shop.com/p");
        let c = Candidates {
            images: vec![img("/a.jpg", 1.0, CandidateSource::Dom)],
            ..Default::default()
        };
        assert_eq!(resolve(&p, &c, &ExtractOptions::default()).unwrap_err(), ResolveError::MissingName);

        let c = Candidates {
            heading: Some("Shoe".into()),
            images: vec![img("/logo.svg", 1.0, CandidateSource::Dom)],
            ..Default::default()
        };
        assert_eq!(resolve(&p, &c, &ExtractOptions::default()).unwrap_err(), ResolveError::MissingImages);
    }

    #[test]
    fn test_rank_images_filters_dedupes_and_caps() {
        let p = page("https://shop.com/products/boot");
        let candidates = vec![
            img("/dom-big.jpg", 500_000.0, CandidateSource::Dom),
            img("https://shop.com/ld.jpg", 2000.0, CandidateSource::Structured),
            img("/ld.jpg", 2000.0, CandidateSource::Structured),
            img("og.jpg", 1500.0, CandidateSource::Meta),
            img("data:image/png;base64,AAAA", 9e9, CandidateSource::Dom),
            img("/icons/star.SVG?v=2", 9e8, CandidateSource::Dom),
            img("/d1.jpg", 40_000.0, CandidateSource::Dom),
            img("/d2.jpg", 30_000.0, CandidateSource::Dom),
            img("/d3.jpg", 20_000.0, CandidateSource::Dom),
        ];
        let images = rank_images(&p, &candidates, 5);
        assert_eq!(
            images,
            vec![
                "https://shop.com/ld.jpg",
                "https://shop.com/products/og.jpg",
                "https://shop.com/dom-big.jpg",
                "https://shop.com/d1.jpg",
                "https://shop.com/d2.jpg",
            ]
        );
    }
}
