pub mod meta;
pub mod price;
pub mod structured;
pub mod visual;

use crate::snapshot::page::Page;
use crate::snapshot::types::{Candidates, CollectorReport, ExtractOptions};

/// One extraction strategy. Collectors never fail: malformed input makes
/// them contribute nothing.
pub trait Collector: Send + Sync {
    fn collect(&self, page: &Page, opts: &ExtractOptions, out: &mut Candidates);

    /// Name used in logs and reports
    fn name(&self) -> &'static str;
}

/// The collectors, in the order they run.
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            collectors: Vec::new(),
        };

        registry.collectors.push(Box::new(structured::StructuredCollector));
        registry.collectors.push(Box::new(meta::MetaCollector));
        registry.collectors.push(Box::new(visual::VisualCollector));
        registry.collectors.push(Box::new(price::PriceSelectorCollector));
        // must stay after the selector collector: it only runs when that found nothing
        registry.collectors.push(Box::new(price::TextWalkCollector));

        registry
    }

    /// Run every collector over `page`.
    pub fn collect(&self, page: &Page, opts: &ExtractOptions) -> (Candidates, Vec<CollectorReport>) {
        let mut out = Candidates {
            heading: page.first_text("h1"),
            document_title: page.title(),
            ..Default::default()
        };
        let mut reports = Vec::with_capacity(self.collectors.len());

        for collector in &self.collectors {
            let before = snapshot_counts(&out);
            collector.collect(page, opts, &mut out);
            let report = describe_delta(collector.name(), &before, &out);
            log::debug!(
                "collector={} images={} fields=[{}]",
                report.name,
                report.images,
                report.fields.join(",")
            );
            reports.push(report);
        }

        (out, reports)
    }
}

struct Counts {
    images: usize,
    fields: Vec<&'static str>,
}

fn snapshot_counts(c: &Candidates) -> Counts {
    Counts {
        images: c.images.len(),
        fields: present_fields(c),
    }
}

fn present_fields(c: &Candidates) -> Vec<&'static str> {
    [
        ("ld.name", c.structured.name.is_some()),
        ("ld.brand", c.structured.brand.is_some()),
        ("ld.price", c.structured.price.is_some()),
        ("meta.title", c.meta.title.is_some()),
        ("meta.site_name", c.meta.site_name.is_some()),
        ("meta.brand", c.meta.brand.is_some()),
        ("meta.price", c.meta.price.is_some()),
        ("dom.price", c.dom_price.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, present)| present.then_some(field))
    .collect()
}

fn describe_delta(name: &'static str, before: &Counts, after: &Candidates) -> CollectorReport {
    let fields = present_fields(after)
        .into_iter()
        .filter(|f| !before.fields.contains(f))
        .map(str::to_string)
        .collect();

    CollectorReport {
        name: name.to_string(),
        images: after.images.len().saturating_sub(before.images),
        fields,
    }
}
