//! Bounded retries around one collect + resolve pass.

use std::{thread::sleep, time::Duration};

use crate::scrape::{self, FetchOptions};
use crate::snapshot::collectors::CollectorRegistry;
use crate::snapshot::normalize::{normalize_brand, retailer_domain};
use crate::snapshot::page::{Page, RawPage};
use crate::snapshot::resolve::resolve;
use crate::snapshot::types::{ExtractOptions, ProductSnapshot, SynthesisReport};

pub const FALLBACK_NAME: &str = "New Item";

/// Where each attempt gets a fresh copy of the page from.
pub trait PageSource: Send + Sync {
    fn url(&self) -> &str;
    fn load(&self) -> anyhow::Result<RawPage>;
}

/// A page supplied up front, e.g. HTML saved by the browser.
pub struct StaticPageSource {
    raw: RawPage,
}

impl StaticPageSource {
    pub fn new(raw: RawPage) -> Self {
        Self { raw }
    }
}

impl PageSource for StaticPageSource {
    fn url(&self) -> &str {
        &self.raw.url
    }

    fn load(&self) -> anyhow::Result<RawPage> {
        Ok(self.raw.clone())
    }
}

/// Re-fetches the page over HTTP on every attempt, so content that shows up
/// late (server-side A/B, lazy rendering caches) gets another chance.
pub struct HttpPageSource {
    url: String,
    fetch: FetchOptions,
}

impl HttpPageSource {
    pub fn new(url: impl Into<String>, fetch: FetchOptions) -> Self {
        Self {
            url: url.into(),
            fetch,
        }
    }
}

impl PageSource for HttpPageSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn load(&self) -> anyhow::Result<RawPage> {
        scrape::fetch_page(&self.url, &self.fetch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            step: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Pause after failed attempt `n` (0-based).
    pub fn delay_after(&self, n: u32) -> Duration {
        self.base_delay + self.step * n
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryState {
    /// About to run attempt `n` (0-based)
    Attempting(u32),
    Succeeded(ProductSnapshot),
    FallenBack(ProductSnapshot),
}

/// Terminal result of [`Extractor::run`].
#[derive(Debug, Clone)]
pub struct Extraction {
    pub snapshot: ProductSnapshot,
    pub fell_back: bool,
    pub attempts: u32,
    /// Report of the successful pass, if there was one
    pub report: Option<SynthesisReport>,
}

/// Runs the collectors and the resolver against a [`PageSource`], retrying
/// until a usable record comes out or the attempts run out.
pub struct Extractor {
    registry: CollectorRegistry,
    options: ExtractOptions,
    policy: RetryPolicy,
}

impl Extractor {
    pub fn new(options: ExtractOptions, policy: RetryPolicy) -> Self {
        Self {
            registry: CollectorRegistry::new(),
            options,
            policy,
        }
    }

    /// One pass over an already loaded page.
    pub fn scan(
        &self,
        page: &Page,
    ) -> Result<(ProductSnapshot, SynthesisReport), crate::snapshot::resolve::ResolveError> {
        let (candidates, collectors) = self.registry.collect(page, &self.options);
        let (snapshot, field_decisions) = resolve(page, &candidates, &self.options)?;
        Ok((
            snapshot,
            SynthesisReport {
                collectors,
                field_decisions,
            },
        ))
    }

    /// Never fails: the worst outcome is a fallback record.
    pub fn run(&self, source: &dyn PageSource) -> Extraction {
        let mut state = RetryState::Attempting(0);
        let mut last_title = None;
        let mut report = None;
        let mut attempts = 0;

        loop {
            state = match state {
                RetryState::Attempting(n) => {
                    attempts = n + 1;
                    self.attempt(n, source, &mut last_title, &mut report)
                }
                RetryState::Succeeded(snapshot) => {
                    return Extraction {
                        snapshot,
                        fell_back: false,
                        attempts,
                        report,
                    }
                }
                RetryState::FallenBack(snapshot) => {
                    return Extraction {
                        snapshot,
                        fell_back: true,
                        attempts,
                        report,
                    }
                }
            };
        }
    }

    fn attempt(
        &self,
        n: u32,
        source: &dyn PageSource,
        last_title: &mut Option<String>,
        report: &mut Option<SynthesisReport>,
    ) -> RetryState {
        let url = source.url();

        match source.load() {
            Ok(raw) => {
                let page = Page::parse(&raw);
                if let Some(title) = page.title() {
                    *last_title = Some(title);
                }
                match self.scan(&page) {
                    Ok((snapshot, _)) if !snapshot.is_usable() => {
                        log::debug!("{url}: attempt {} produced an unusable record", n + 1)
                    }
                    Ok((snapshot, pass_report)) => {
                        log::info!(
                            "{url}: extracted {:?} with {} image(s) on attempt {}",
                            snapshot.name,
                            snapshot.image_urls.len(),
                            n + 1
                        );
                        *report = Some(pass_report);
                        return RetryState::Succeeded(snapshot);
                    }
                    Err(err) => log::debug!("{url}: attempt {} unusable: {err}", n + 1),
                }
            }
            Err(err) => log::warn!("{url}: attempt {} failed to load: {err:#}", n + 1),
        }

        if n + 1 < self.policy.max_attempts {
            sleep(self.policy.delay_after(n));
            RetryState::Attempting(n + 1)
        } else {
            log::info!("{url}: giving up after {} attempt(s), using fallback", n + 1);
            RetryState::FallenBack(fallback_record(url, last_title.as_deref()))
        }
    }
}

/// The minimal record used when extraction never succeeded.
pub fn fallback_record(url: &str, title: Option<&str>) -> ProductSnapshot {
    let domain = retailer_domain(url);
    let name = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_string();

    ProductSnapshot {
        url: url.to_string(),
        brand: normalize_brand(&domain),
        retailer_domain: domain,
        name,
        ..Default::default()
    }
}
