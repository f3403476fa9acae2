//! JSON-LD `Product` extraction.

use serde::Deserialize;
use serde_json::Value;

use super::Collector;
use crate::snapshot::page::{clean_text, Page};
use crate::snapshot::types::{
    CandidateSource, Candidates, ExtractOptions, ImageCandidate, STRUCTURED_IMAGE_SCORE,
};

pub struct StructuredCollector;

impl Collector for StructuredCollector {
    fn collect(&self, page: &Page, _opts: &ExtractOptions, out: &mut Candidates) {
        for script in page.select_all(r#"script[type="application/ld+json"]"#) {
            let text = script.text().collect::<String>();
            let json = match serde_json::from_str::<Value>(text.trim()) {
                Ok(json) => json,
                Err(err) => {
                    log::debug!("skipping malformed ld+json block: {err}");
                    continue;
                }
            };

            let Some(node) = find_product(&json) else {
                continue;
            };
            let product = ProductNode::from_value(node);

            if out.structured.name.is_none() {
                out.structured.name = product.name.clone();
            }
            if out.structured.brand.is_none() {
                out.structured.brand = product.brand.clone();
            }
            if out.structured.price.is_none() {
                out.structured.price = product.price.clone();
            }

            out.images.extend(product.images.into_iter().map(|url| {
                ImageCandidate::new(url, STRUCTURED_IMAGE_SCORE, CandidateSource::Structured)
            }));
        }
    }

    fn name(&self) -> &'static str {
        "structured"
    }
}

/// The first `Product` node of a JSON-LD document. Accepts a single object or
/// an array, and looks one level into `@graph`.
pub fn find_product(json: &Value) -> Option<&Value> {
    let nodes: Vec<&Value> = match json {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    nodes
        .into_iter()
        .flat_map(|node| match node.get("@graph") {
            Some(Value::Array(graph)) => graph.iter().collect::<Vec<_>>(),
            Some(graph) => vec![graph],
            None => vec![node],
        })
        .find(|node| is_product_type(node.get("@type")))
}

fn is_product_type(node_type: Option<&Value>) -> bool {
    match node_type {
        Some(Value::String(t)) => t == "Product",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Product")),
        _ => false,
    }
}

/// A validated JSON-LD product. Every field that is missing or has an
/// unexpected shape is `None` (or empty).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductNode {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BrandField {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageRef {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Text(String),
    Number(serde_json::Number),
}

impl PriceValue {
    fn into_string(self) -> Option<String> {
        let s = match self {
            PriceValue::Text(s) => s.trim().to_string(),
            PriceValue::Number(n) => n.to_string(),
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

#[derive(Debug, Deserialize)]
struct Offer {
    #[serde(default)]
    price: Option<PriceValue>,
    #[serde(default, rename = "lowPrice")]
    low_price: Option<PriceValue>,
}

/// Parse one field, treating any shape mismatch as absent.
fn field<T: serde::de::DeserializeOwned>(node: &Value, key: &str) -> Option<T> {
    let value = node.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::debug!("ld+json field {key:?} has unexpected shape: {err}");
            None
        }
    }
}

impl ProductNode {
    pub fn from_value(node: &Value) -> Self {
        let name = field::<String>(node, "name")
            .map(|n| clean_text(&n))
            .filter(|n| !n.is_empty());

        let brand = field::<BrandField>(node, "brand")
            .and_then(|b| match b {
                BrandField::Name(name) => Some(name),
                BrandField::Object { name } => name,
            })
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        let price = field::<OneOrMany<Offer>>(node, "offers")
            .and_then(|offers| offers.into_vec().into_iter().next())
            .and_then(|offer| offer.price.or(offer.low_price))
            .and_then(PriceValue::into_string);

        let images = field::<OneOrMany<ImageRef>>(node, "image")
            .or_else(|| field::<OneOrMany<ImageRef>>(node, "imageUrl"))
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|img| match img {
                ImageRef::Url(url) => Some(url),
                ImageRef::Object { url } => url,
            })
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        Self {
            name,
            brand,
            price,
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::page::RawPage;
    use serde_json::json;

    fn collect(html: &str) -> Candidates {
        let page = Page::parse(&RawPage::new("https://x.com/p/1", html));
        let mut out = Candidates::default();
        StructuredCollector.collect(&page, &ExtractOptions::default(), &mut out);
        out
    }

    fn ld(body: &str) -> String {
        format!(r#"<html><head><script type="application/ld+json">{body}</script></head><body></body></html>"#)
    }

    #[test]
    fn test_simple_product() {
        let out = collect(&ld(
            r#"{"@type":"Product","name":"Classic Tee","brand":"Acme","offers":{"price":"25.00"},"image":"https://x.com/a.jpg"}"#,
        ));
        assert_eq!(out.structured.name.as_deref(), Some("Classic Tee"));
        assert_eq!(out.structured.brand.as_deref(), Some("Acme"));
        assert_eq!(out.structured.price.as_deref(), Some("25.00"));
        assert_eq!(out.images.len(), 1);
        assert_eq!(out.images[0].source, CandidateSource::Structured);
        assert_eq!(out.images[0].score, STRUCTURED_IMAGE_SCORE);
    }

    #[test]
    fn test_graph_and_nested_shapes() {
        let out = collect(&ld(
            r#"{"@graph":[{"@type":"WebPage","name":"Page"},{"@type":["Product","Thing"],"name":"Boot","brand":{"@type":"Brand","name":"Frye"},"offers":[{"price":189},{"price":"99"}],"image":[{"@type":"ImageObject","url":"/a.jpg"},"/b.jpg",{"caption":"no url"}]}]}"#,
        ));
        assert_eq!(out.structured.name.as_deref(), Some("Boot"));
        assert_eq!(out.structured.brand.as_deref(), Some("Frye"));
        assert_eq!(out.structured.price.as_deref(), Some("189"));
        let urls: Vec<_> = out.images.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["/a.jpg", "/b.jpg"]);
    }

    #[test]
    fn test_top_level_array() {
        let out = collect(&ld(
            r#"[{"@type":"BreadcrumbList"},{"@type":"Product","name":"Bag","imageUrl":"https://x.com/bag.jpg"}]"#,
        ));
        assert_eq!(out.structured.name.as_deref(), Some("Bag"));
        assert_eq!(out.images[0].url, "https://x.com/bag.jpg");
    }

    #[test]
    fn test_aggregate_offer_low_price() {
        let node = json!({"@type":"Product","offers":{"@type":"AggregateOffer","lowPrice":"40.00"}});
        assert_eq!(ProductNode::from_value(&node).price.as_deref(), Some("40.00"));
    }

    #[test]
    fn test_malformed_json_contributes_nothing() {
        let out = collect(&ld(r#"{"@type":"Product","name": oops}"#));
        assert_eq!(out.structured, Default::default());
        assert!(out.images.is_empty());
    }

    #[test]
    fn test_wrong_shapes_are_none() {
        let node = json!({"@type":"Product","name":42,"brand":true,"offers":"free","image":{"width":10}});
        let product = ProductNode::from_value(&node);
        assert_eq!(product, ProductNode::default());
    }

    #[test]
    fn test_non_product_ignored() {
        let out = collect(&ld(r#"{"@type":"Article","name":"News","image":"https://x.com/n.jpg"}"#));
        assert!(out.structured.name.is_none());
        assert!(out.images.is_empty());
    }

    #[test]
    fn test_first_product_block_wins_fields() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type":"Product","name":"First","image":"/1.jpg"}</script>
            <script type="application/ld+json">{"@type":"Product","name":"Second","brand":"Late","image":"/2.jpg"}</script>
        </head></html>"#;
        let out = collect(html);
        assert_eq!(out.structured.name.as_deref(), Some("First"));
        assert_eq!(out.structured.brand.as_deref(), Some("Late"));
        assert_eq!(out.images.len(), 2);
    }
}
