use super::Collector;
use crate::snapshot::page::Page;
use crate::snapshot::types::{
    CandidateSource, Candidates, ExtractOptions, ImageCandidate, MetaFields, META_IMAGE_SCORE,
};

/// Reads open-graph, twitter and product meta tags.
pub struct MetaCollector;

/// Tags are declared as `property=` by the open-graph protocol but plenty of
/// sites use `name=`; accept either.
fn meta(page: &Page, key: &str) -> Option<String> {
    page.meta_content("property", key)
        .or_else(|| page.meta_content("name", key))
}

fn first_meta(page: &Page, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| meta(page, key))
}

impl Collector for MetaCollector {
    fn collect(&self, page: &Page, _opts: &ExtractOptions, out: &mut Candidates) {
        out.meta = MetaFields {
            title: meta(page, "og:title"),
            site_name: meta(page, "og:site_name"),
            brand: first_meta(page, &["product:brand", "twitter:site"]),
            price: first_meta(page, &["product:price:amount", "og:price:amount"]),
        };

        if let Some(image) = meta(page, "og:image") {
            out.images
                .push(ImageCandidate::new(image, META_IMAGE_SCORE, CandidateSource::Meta));
        }
    }

    fn name(&self) -> &'static str {
        "meta"
    }
}
