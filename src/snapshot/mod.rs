pub mod collectors;
pub mod images;
pub mod normalize;
pub mod page;
pub mod resolve;
pub mod retry;
pub mod rules;
pub mod types;

pub use images::{materialize, HttpImageFetcher, ImageFetcher};
pub use page::RawPage;
pub use retry::{Extraction, Extractor, HttpPageSource, PageSource, RetryPolicy, StaticPageSource};
pub use types::{ExtractOptions, ProductSnapshot};

/// Full content-side pipeline: retried extraction, then image inlining.
///
/// A fallback record has no images, so nothing is fetched for it.
pub fn extract_snapshot(
    extractor: &Extractor,
    source: &dyn PageSource,
    fetcher: Option<&dyn ImageFetcher>,
) -> Extraction {
    let mut extraction = extractor.run(source);
    if let Some(fetcher) = fetcher {
        materialize(&mut extraction.snapshot, fetcher);
    }
    extraction
}
