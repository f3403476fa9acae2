use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// A loaded page in a form that can cross threads. Parse it with [`Page::parse`]
/// on the thread that runs the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPage {
    pub url: String,
    pub html: String,
}

impl RawPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// Parsed document plus the URL relative references resolve against.
pub struct Page {
    pub url: String,
    base: Option<Url>,
    document: Html,
}

impl Page {
    pub fn parse(raw: &RawPage) -> Self {
        let document = Html::parse_document(&raw.html);
        let page_url = Url::parse(&raw.url).ok();

        // <base href> wins over the page URL when present
        let base = match (page_url.as_ref(), base_href(&document)) {
            (Some(page), Some(href)) => page.join(&href).ok().or_else(|| page_url.clone()),
            (None, Some(href)) => Url::parse(&href).ok(),
            (page, None) => page.cloned(),
        };

        Self {
            url: raw.url.clone(),
            base,
            document,
        }
    }

    /// All elements matching `css`. An unparsable selector matches nothing.
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(sel) => self.document.select(&sel).collect(),
            Err(err) => {
                log::debug!("bad selector {css:?}: {err:?}");
                Vec::new()
            }
        }
    }

    pub fn first(&self, css: &str) -> Option<ElementRef<'_>> {
        let sel = Selector::parse(css).ok()?;
        let found = self.document.select(&sel).next();
        found
    }

    /// Whitespace-collapsed text of the first match, if non-empty.
    pub fn first_text(&self, css: &str) -> Option<String> {
        self.first(css).and_then(|el| non_empty(element_text(&el)))
    }

    /// `content` of `<meta {attr}="{key}">`, if non-empty.
    pub fn meta_content(&self, attr: &str, key: &str) -> Option<String> {
        let css = format!(r#"meta[{attr}="{key}"]"#);
        self.first(&css)
            .and_then(|el| el.value().attr("content"))
            .and_then(|content| non_empty(content.trim().to_string()))
    }

    pub fn title(&self) -> Option<String> {
        self.first_text("title")
    }

    /// The region most likely to hold the product: `main`, then
    /// `[role="main"]`, then `body`.
    pub fn main_region(&self) -> Option<ElementRef<'_>> {
        self.first("main")
            .or_else(|| self.first(r#"[role="main"]"#))
            .or_else(|| self.first("body"))
    }

    /// Resolve a possibly relative reference to an absolute URL.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        match &self.base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Url::parse(href).ok().map(|u| u.to_string()),
        }
    }
}

fn base_href(document: &Html) -> Option<String> {
    let sel = Selector::parse("base[href]").ok()?;
    let href = document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string());
    href.filter(|h| !h.is_empty())
}

/// Concatenated descendant text with whitespace runs collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
