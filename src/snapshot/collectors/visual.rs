use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use super::Collector;
use crate::snapshot::page::Page;
use crate::snapshot::rules::score_image;
use crate::snapshot::types::{CandidateSource, Candidates, ExtractOptions, ImageCandidate};

static STYLE_WIDTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*width\s*:\s*(\d+(?:\.\d+)?)px").expect("valid width regex")
});
static STYLE_HEIGHT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*height\s*:\s*(\d+(?:\.\d+)?)px").expect("valid height regex")
});

/// Scores every sizeable `<img>` on the page by area and identifier hints.
pub struct VisualCollector;

impl Collector for VisualCollector {
    fn collect(&self, page: &Page, opts: &ExtractOptions, out: &mut Candidates) {
        for img in page.select_all("img") {
            let (width, height) = dimensions(&img);
            if width < opts.min_image_px || height < opts.min_image_px {
                continue;
            }

            let el = img.value();
            let identifier = format!(
                "{}{}{}",
                el.attr("class").unwrap_or_default(),
                el.attr("alt").unwrap_or_default(),
                el.attr("src").unwrap_or_default(),
            );
            let score = score_image(f64::from(width) * f64::from(height), &identifier);

            if let Some(src) = rendered_source(&img) {
                out.images
                    .push(ImageCandidate::new(src, score, CandidateSource::Dom));
            }
        }
    }

    fn name(&self) -> &'static str {
        "visual"
    }
}

/// Pixel size from `width`/`height` attributes, falling back to inline
/// style. Unknown dimensions are 0.
pub fn dimensions(img: &ElementRef<'_>) -> (u32, u32) {
    let el = img.value();
    let style = el.attr("style").unwrap_or_default();

    let width = el
        .attr("width")
        .and_then(parse_px)
        .or_else(|| style_px(&STYLE_WIDTH, style))
        .unwrap_or(0);
    let height = el
        .attr("height")
        .and_then(parse_px)
        .or_else(|| style_px(&STYLE_HEIGHT, style))
        .unwrap_or(0);

    (width, height)
}

/// Leading integer of an attribute like `200` or `200px`. Percentages are
/// relative to the container and count as unknown.
fn parse_px(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.ends_with('%') {
        return None;
    }
    let digits: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn style_px(re: &Regex, style: &str) -> Option<u32> {
    let caps = re.captures(style)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(value as u32)
}

/// The source a browser would end up showing: the largest `srcset` entry,
/// then `src`, then a lazy-loading `data-src`.
pub fn rendered_source(img: &ElementRef<'_>) -> Option<String> {
    let el = img.value();
    el.attr("srcset")
        .and_then(largest_srcset_entry)
        .or_else(|| non_empty(el.attr("src")))
        .or_else(|| non_empty(el.attr("data-src")))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Pick the entry with the biggest `w`/`x` descriptor. Entries without a
/// descriptor count as `1x`.
fn largest_srcset_entry(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let weight = parts
                .next()
                .and_then(|d| d.get(..d.len().saturating_sub(1)))
                .and_then(|n| n.parse::<f64>().ok())
                .unwrap_or(1.0);
            Some((url.to_string(), weight))
        })
        .fold(None::<(String, f64)>, |best, (url, weight)| match best {
            Some((_, best_weight)) if best_weight >= weight => best,
            _ => Some((url, weight)),
        })
        .map(|(url, _)| url)
}
