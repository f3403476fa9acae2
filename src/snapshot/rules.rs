//! Heuristic tables for image scoring and price lookup.
//!
//! Kept as plain data so they can be tuned and tested without touching the
//! collectors that walk them.

/// Multiplies an image's score when any needle occurs in its identifier
/// (class + alt + src, lowercased). Each rule applies at most once.
#[derive(Debug, Clone, Copy)]
pub struct ImageRule {
    pub needles: &'static [&'static str],
    pub multiplier: f64,
}

pub const IMAGE_RULES: &[ImageRule] = &[
    // looks like the hero product shot
    ImageRule {
        needles: &["main", "primary", "product"],
        multiplier: 1.5,
    },
    // high resolution variants
    ImageRule {
        needles: &["zoom", "full"],
        multiplier: 1.2,
    },
    // colour swatches and thumbnail strips
    ImageRule {
        needles: &["swatch", "thumb"],
        multiplier: 0.5,
    },
];

/// Apply every matching rule to `base` for the given identifier.
pub fn score_image(base: f64, identifier: &str) -> f64 {
    let identifier = identifier.to_lowercase();
    IMAGE_RULES
        .iter()
        .filter(|rule| rule.needles.iter().any(|n| identifier.contains(n)))
        .fold(base, |score, rule| score * rule.multiplier)
}

/// Selectors known to hold price text, in the order they are tried.
pub const PRICE_SELECTORS: &[&str] = &[
    r#"[itemprop="price"]"#,
    r#"[class*="price"]"#,
    r#"[id*="price"]"#,
    r#"[class*="sale"]"#,
    r#"[class*="amount"]"#,
    r#"[data-element="product-price"]"#,
    ".money",
    ".current-price",
    ".product-prices__price",
];

/// Tags that render their content struck through.
pub const STRIKETHROUGH_TAGS: &[&str] = &["s", "del", "strike"];

/// Elements whose text never counts as visible page text.
pub const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];
