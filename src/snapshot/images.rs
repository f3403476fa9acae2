//! Inline the chosen images as `data:` URLs so the admin API never has to
//! reach back to the retailer.

use std::thread;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::scrape::{self, FetchOptions};
use crate::snapshot::types::ProductSnapshot;

pub trait ImageFetcher: Send + Sync {
    /// Raw body of `url`, `None` on any failure.
    fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}

pub struct HttpImageFetcher {
    fetch: FetchOptions,
}

impl HttpImageFetcher {
    pub fn new(fetch: FetchOptions) -> Self {
        Self { fetch }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        scrape::fetch_bytes(url, &self.fetch)
    }
}

/// `data:<mime>;base64,…` for bytes that sniff as an image.
pub fn to_data_url(bytes: &[u8]) -> Option<String> {
    let kind = infer::get(bytes)?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return None;
    }
    Some(format!("data:{};base64,{}", kind.mime_type(), STANDARD.encode(bytes)))
}

fn inline(fetcher: &dyn ImageFetcher, url: &str) -> Option<String> {
    let data = fetcher.fetch(url).and_then(|bytes| to_data_url(&bytes));
    if data.is_none() {
        log::debug!("image {url} could not be inlined");
    }
    data
}

/// Fill `image_url`, `image_base64` and `gallery_base64` from `image_urls`.
///
/// Every image is fetched concurrently. A failed primary leaves
/// `image_base64` empty; failed gallery entries are dropped.
pub fn materialize(snapshot: &mut ProductSnapshot, fetcher: &dyn ImageFetcher) {
    let Some((primary, gallery)) = snapshot.image_urls.split_first() else {
        return;
    };

    let (primary_data, gallery_data) = thread::scope(|s| {
        let primary_handle = s.spawn(|| inline(fetcher, primary));
        let gallery_handles: Vec<_> = gallery
            .iter()
            .map(|url| s.spawn(move || inline(fetcher, url)))
            .collect();

        let primary_data = primary_handle.join().ok().flatten();
        let gallery_data: Vec<String> = gallery_handles
            .into_iter()
            .filter_map(|h| h.join().ok().flatten())
            .collect();
        (primary_data, gallery_data)
    });

    log::debug!(
        "materialized primary={} gallery={}/{}",
        primary_data.is_some(),
        gallery_data.len(),
        gallery.len()
    );

    snapshot.image_url = Some(primary.clone());
    snapshot.image_base64 = primary_data;
    snapshot.gallery_base64 = gallery_data;
}
