use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Lower bound (inclusive) of a plausible price. Anything cheaper is shipping
/// or a `$0.00` placeholder.
pub const MIN_PRICE: f64 = 1.0;
/// Upper bound (exclusive). Anything larger is usually two prices glued together.
pub const MAX_PRICE: f64 = 10_000.0;

static PRICE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\$£€¥]?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)").expect("valid price regex")
});

static STANDALONE_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\$£€¥]\s*\d+(?:,\d{3})*(?:\.\d{2})?$").expect("valid standalone price regex")
});

static CURRENCY_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\$£€¥]").expect("valid currency regex"));

static LEADING_WWW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^www\.").expect("valid regex"));
static TRAILING_COM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.com$").expect("valid regex"));
static TRAILING_NET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.net$").expect("valid regex"));
static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid camel regex"));
static WORD_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w").expect("valid word regex"));

/// Extract the first currency amount from free text.
///
/// Returns the matched literal, trimmed, with `default_currency` prepended
/// when the text carried no symbol. Amounts outside `[1, 10000)` yield `None`.
pub fn normalize_price(raw: &str, default_currency: &str) -> Option<String> {
    let caps = PRICE_TOKEN.captures(raw)?;
    let digits = caps.get(1)?.as_str().replace(',', "");
    let value: f64 = digits.parse().ok()?;

    if !(MIN_PRICE..MAX_PRICE).contains(&value) {
        log::debug!("price {value} out of range, ignoring");
        return None;
    }

    let literal = caps.get(0)?.as_str().trim();
    if has_currency_symbol(literal) {
        Some(literal.to_string())
    } else {
        Some(format!("{default_currency}{literal}"))
    }
}

/// True when the text is exactly a currency amount and nothing else.
pub fn is_standalone_price(text: &str) -> bool {
    STANDALONE_PRICE.is_match(text)
}

pub fn has_currency_symbol(text: &str) -> bool {
    CURRENCY_SYMBOL.is_match(text)
}

/// Turn a scraped brand string or a bare domain into a display name.
///
/// `@acme` → `Acme`, `www.acme-store.com` → `Acme Store`,
/// `AcmeWear` → `Acme Wear`, `ACME` → `Acme`.
pub fn normalize_brand(raw: &str) -> Option<String> {
    let mut clean = raw.trim().to_string();
    if let Some(stripped) = clean.strip_prefix('@') {
        clean = stripped.to_string();
    }

    clean = LEADING_WWW.replace(&clean, "").into_owned();
    clean = TRAILING_COM.replace(&clean, "").into_owned();
    clean = TRAILING_NET.replace(&clean, "").into_owned();

    if (clean.contains('-') || clean.contains('_')) && !clean.contains(' ') {
        clean = clean.replace(['-', '_'], " ");
    }

    clean = CAMEL_BOUNDARY.replace_all(&clean, "$1 $2").into_owned();

    if clean == clean.to_lowercase() || clean == clean.to_uppercase() {
        let lower = clean.to_lowercase();
        clean = WORD_START
            .replace_all(&lower, |caps: &regex::Captures| caps[0].to_uppercase())
            .into_owned();
    }

    let clean = clean.trim();
    if clean.is_empty() {
        None
    } else {
        Some(clean.to_string())
    }
}

/// Host of `url` without a leading `www.`. Empty for host-less URLs.
pub fn retailer_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|host| host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
        .unwrap_or_default()
}
