//! DOM price lookup: a selector scan, then a text-node walk as last resort.

use scraper::{ElementRef, Node};

use super::Collector;
use crate::snapshot::normalize::{is_standalone_price, normalize_price};
use crate::snapshot::page::{clean_text, Page};
use crate::snapshot::rules::{NON_CONTENT_TAGS, PRICE_SELECTORS, STRIKETHROUGH_TAGS};
use crate::snapshot::types::{Candidates, ExtractOptions};

/// Tries [`PRICE_SELECTORS`] in order and keeps the first element whose text
/// normalizes to a price. Struck-through (was/MSRP) prices are skipped.
pub struct PriceSelectorCollector;

impl Collector for PriceSelectorCollector {
    fn collect(&self, page: &Page, opts: &ExtractOptions, out: &mut Candidates) {
        out.dom_price = find_by_selectors(page, &opts.default_currency);
    }

    fn name(&self) -> &'static str {
        "price-selectors"
    }
}

pub fn find_by_selectors(page: &Page, default_currency: &str) -> Option<String> {
    for sel in PRICE_SELECTORS {
        for el in page.select_all(sel) {
            if is_struck_through(&el) {
                log::debug!("skipping struck-through price under {sel}");
                continue;
            }
            if let Some(price) = normalize_price(&unstruck_text(&el), default_currency) {
                log::debug!("price {price:?} found with {sel}");
                return Some(price);
            }
        }
    }
    None
}

/// Walks text nodes of the main region for a node that is exactly a
/// currency amount. Only runs when the selector scan found nothing.
pub struct TextWalkCollector;

impl Collector for TextWalkCollector {
    fn collect(&self, page: &Page, _opts: &ExtractOptions, out: &mut Candidates) {
        if out.dom_price.is_none() {
            out.dom_price = walk_text(page);
        }
    }

    fn name(&self) -> &'static str {
        "text-walk"
    }
}

pub fn walk_text(page: &Page) -> Option<String> {
    let region = page.main_region()?;

    for node in region.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let content: &str = &text.text;
        let content = content.trim();
        if !is_standalone_price(content) {
            continue;
        }

        let mut ancestors = node.ancestors().filter_map(ElementRef::wrap);
        let hidden = ancestors.any(|el| {
            NON_CONTENT_TAGS.contains(&el.value().name()) || strikes(&el)
        });
        if hidden {
            continue;
        }

        return Some(content.to_string());
    }
    None
}

/// Text of `el` without the parts under struck-through descendants, so a
/// container holding both the old and the new price yields only the new one.
pub fn unstruck_text(el: &ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in el.descendants() {
        let Node::Text(t) = node.value() else {
            continue;
        };
        let struck = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .filter_map(ElementRef::wrap)
            .any(|a| strikes(&a));
        if !struck {
            text.push_str(t);
            text.push(' ');
        }
    }
    clean_text(&text)
}

/// True when the element or any ancestor renders struck through.
pub fn is_struck_through(el: &ElementRef<'_>) -> bool {
    std::iter::once(*el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|e| strikes(&e))
}

fn strikes(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    if STRIKETHROUGH_TAGS.contains(&value.name()) {
        return true;
    }
    value
        .attr("style")
        .map(|style| style.to_lowercase().contains("line-through"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::page::RawPage;

    fn page(body: &str) -> Page {
        let html = format!("<html><head><title>t</title></head><body>{body}</body></html>");
        Page::parse(&RawPage::new("https://shop.com/p", html))
    }

    #[test]
    fn test_itemprop_first() {
        let p = page(r#"<span class="price">$80.00</span><meta itemprop="price" content="70"><span itemprop="price">$75.00</span>"#);
        assert_eq!(find_by_selectors(&p, "$").as_deref(), Some("$75.00"));
    }

    #[test]
    fn test_strikethrough_tag_skipped() {
        let p = page(r#"<s class="price">$120.00</s><span class="price">$89.00</span>"#);
        assert_eq!(find_by_selectors(&p, "$").as_deref(), Some("$89.00"));
    }

    #[test]
    fn test_strikethrough_style_skipped() {
        let p = page(
            r#"<span class="price" style="text-decoration: line-through">$120.00</span>
               <span class="sale">$60.00</span>"#,
        );
        assert_eq!(find_by_selectors(&p, "$").as_deref(), Some("$60.00"));
    }

    #[test]
    fn test_strikethrough_ancestor_skipped() {
        let p = page(r#"<del><span class="amount">$45.00</span></del><div id="price-now">$30.00</div>"#);
        assert_eq!(find_by_selectors(&p, "$").as_deref(), Some("$30.00"));
    }

    #[test]
    fn test_struck_child_of_matched_container_ignored() {
        let p = page(r#"<div class="product-price"><s>$120.00</s><span>$89.00</span></div>"#);
        assert_eq!(find_by_selectors(&p, "$").as_deref(), Some("$89.00"));

        let p = page(r#"<div class="price"><span style="text-decoration:line-through">$70.00</span></div><span class="sale">$55.00</span>"#);
        assert_eq!(find_by_selectors(&p, "$").as_deref(), Some("$55.00"));
    }

    #[test]
    fn test_unparsable_text_continues_scan() {
        let p = page(r#"<div class="price-label">Price</div><div class="price-value">$19.00</div>"#);
        assert_eq!(find_by_selectors(&p, "$").as_deref(), Some("$19.00"));
    }

    #[test]
    fn test_only_strikethrough_yields_none() {
        let p = page(r#"<s class="price">$120.00</s>"#);
        assert_eq!(find_by_selectors(&p, "$"), None);
    }

    #[test]
    fn test_retailer_specific_class() {
        let p = page(r#"<div class="product-prices__price">$210.00</div>"#);
        // matches [class*="price"] before the dedicated selector, same element
        assert_eq!(find_by_selectors(&p, "$").as_deref(), Some("$210.00"));
    }

    #[test]
    fn test_walk_finds_standalone_amount_in_main() {
        let p = page(
            r#"<header><b>$5.00</b></header>
               <main><p>Ships in 2 days for $5.99 flat</p><div><b>$19.99</b></div></main>"#,
        );
        assert_eq!(walk_text(&p).as_deref(), Some("$19.99"));
    }

    #[test]
    fn test_walk_ignores_scripts_and_struck_text() {
        let p = page(r#"<script>$9.99</script><s>$50.00</s><p>  $39.00 </p>"#);
        assert_eq!(walk_text(&p).as_deref(), Some("$39.00"));
    }

    #[test]
    fn test_walk_runs_only_without_selector_result() {
        let p = page("<main><b>$19.99</b></main>");
        let mut out = Candidates {
            dom_price: Some("$1.00".into()),
            ..Default::default()
        };
        TextWalkCollector.collect(&p, &ExtractOptions::default(), &mut out);
        assert_eq!(out.dom_price.as_deref(), Some("$1.00"));

        let mut out = Candidates::default();
        TextWalkCollector.collect(&p, &ExtractOptions::default(), &mut out);
        assert_eq!(out.dom_price.as_deref(), Some("$19.99"));
    }
}
