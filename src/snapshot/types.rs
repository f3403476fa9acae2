use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Upper bound on images kept per snapshot
pub const MAX_IMAGES: usize = 5;
/// Images smaller than this in either dimension are treated as icons
pub const MIN_IMAGE_PX: u32 = 100;
pub const DEFAULT_CURRENCY: &str = "$";

/// Score given to images found in structured product data
pub const STRUCTURED_IMAGE_SCORE: f64 = 2000.0;
/// Score given to the social/open-graph image
pub const META_IMAGE_SCORE: f64 = 1500.0;

/// Where a candidate came from. Declaration order is the priority order:
/// a structured-data candidate always outranks a meta candidate, which
/// always outranks a plain DOM image regardless of pixel area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Dom,
    Meta,
    Structured,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    /// Absolute or relative, as found on the page
    pub url: String,
    pub score: f64,
    pub source: CandidateSource,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>, score: f64, source: CandidateSource) -> Self {
        Self {
            url: url.into(),
            score,
            source,
        }
    }

    /// Descending desirability: higher source rank first, then higher score.
    pub fn desirability(a: &Self, b: &Self) -> Ordering {
        b.source
            .cmp(&a.source)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
    }
}

/// Fields read from the first JSON-LD `Product` node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredFields {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
}

/// Fields read from social/open-graph and product meta tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaFields {
    pub title: Option<String>,
    pub site_name: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
}

/// Everything the collectors produced during one scan pass.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub structured: StructuredFields,
    pub meta: MetaFields,
    pub images: Vec<ImageCandidate>,
    /// Price found by the selector scan or, failing that, the text walk
    pub dom_price: Option<String>,
    /// First `h1` text
    pub heading: Option<String>,
    /// `<title>` text
    pub document_title: Option<String>,
}

/// The resolved product record handed to the preview and the admin API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub url: String,
    pub retailer_domain: String,
    pub name: String,
    pub brand: Option<String>,
    pub price: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gallery_base64: Vec<String>,
}

impl ProductSnapshot {
    /// A snapshot is usable only with a name and at least one image.
    pub fn is_usable(&self) -> bool {
        !self.name.trim().is_empty() && !self.image_urls.is_empty()
    }

    /// Number of extra images shown as a badge next to the primary one.
    pub fn gallery_count(&self) -> usize {
        self.gallery_base64.len()
    }
}

/// Tunables for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub max_images: usize,
    pub min_image_px: u32,
    pub default_currency: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_images: MAX_IMAGES,
            min_image_px: MIN_IMAGE_PX,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SynthesisReport {
    pub collectors: Vec<CollectorReport>,
    pub field_decisions: Vec<FieldDecision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorReport {
    pub name: String,
    pub images: usize,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecision {
    pub field: String,
    pub winner: String,
    pub value_preview: Option<String>,
}
