//! Blocking HTTP fetches for product pages and product images.

use anyhow::anyhow;
use reqwest::StatusCode;
use std::{error::Error, thread::sleep, time::Duration};

use crate::snapshot::page::RawPage;

pub const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

/// How page and image requests are made.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    /// Attempts per URL, including the proxied retry
    pub attempts: u32,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT_DEFAULT.to_string(),
            attempts: 3,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Innermost readable cause of a transport error.
fn root_cause(error: &reqwest::Error) -> String {
    let mut cause: &dyn Error = error;
    while let Some(source) = cause.source() {
        cause = source;
    }
    cause.to_string()
}

/// What a single GET came back with.
enum Attempt {
    Body(Vec<u8>),
    Status(StatusCode),
    Transport,
}

fn attempt_once(url: &str, label: &str, opts: &FetchOptions, proxy: Option<&str>) -> Attempt {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(opts.user_agent.as_str())
        .timeout(opts.timeout)
        .pool_idle_timeout(opts.timeout);

    if let Some(proxy) = proxy {
        log::debug!("{label}: via proxy {proxy}");
        match reqwest::Proxy::all(proxy) {
            Ok(p) => builder = builder.proxy(p),
            Err(err) => log::warn!("ignoring OPT_PROXY: {err}"),
        }
    }

    let client = match builder.build() {
        Ok(client) => client,
        Err(err) => {
            log::error!("{label}: cannot build http client: {err}");
            return Attempt::Transport;
        }
    };

    let resp = match client.get(url).send() {
        Ok(resp) => resp,
        Err(err) => {
            log::warn!("{label}: {}", root_cause(&err));
            return Attempt::Transport;
        }
    };

    let status = resp.status();
    if status != StatusCode::OK {
        log::debug!("{label}: {status}");
        return Attempt::Status(status);
    }

    match resp.bytes() {
        Ok(bytes) => Attempt::Body(bytes.to_vec()),
        Err(err) => {
            log::debug!("{label}: body read failed, timeout={}", err.is_timeout());
            Attempt::Transport
        }
    }
}

/// GET `url`, retrying transport failures. After the first failure the
/// request goes through `$OPT_PROXY` when it is set.
///
/// Returns the first `200 OK` body, or the last non-OK status with an empty
/// body when a client error makes retrying pointless.
pub fn reqwest_with_retries(url: &str, opts: &FetchOptions) -> Option<(StatusCode, Vec<u8>)> {
    let proxy = std::env::var("OPT_PROXY")
        .ok()
        .filter(|p| !p.trim().is_empty());

    // protocol-relative image srcs
    let url = match url.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    };

    let parsed = match reqwest::Url::parse(&url) {
        Ok(u) => u,
        Err(err) => {
            log::warn!("{url}: invalid url: {err}");
            return None;
        }
    };
    let label = format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path());

    let mut proxied = false;
    let mut last_status = None;

    for n in 1..=opts.attempts.max(1) {
        if n > 1 {
            log::debug!("{label}: attempt {n}");
        }

        let via = if proxied { proxy.as_deref() } else { None };
        match attempt_once(&url, &label, opts, via) {
            Attempt::Body(bytes) => return Some((StatusCode::OK, bytes)),
            Attempt::Transport => proxied = true,
            Attempt::Status(status) => {
                last_status = Some(status);
                if status == StatusCode::TOO_MANY_REQUESTS {
                    sleep(Duration::from_secs(u64::from(n) * 4));
                }
                if status.is_client_error() {
                    // retrying only helps when a proxy is still untried
                    if proxied || proxy.is_none() {
                        return Some((status, Vec::new()));
                    }
                    proxied = true;
                }
            }
        }
    }

    last_status.map(|status| (status, Vec::new()))
}

/// Load a page's HTML.
pub fn fetch_page(url: &str, opts: &FetchOptions) -> anyhow::Result<RawPage> {
    let (status, bytes) =
        reqwest_with_retries(url, opts).ok_or_else(|| anyhow!("{url}: request failed"))?;

    if !status.is_success() {
        return Err(anyhow!("{url}: server answered {status}"));
    }

    Ok(RawPage::new(url, String::from_utf8_lossy(&bytes).to_string()))
}

/// Raw bytes of `url`, or `None` on any failure.
pub fn fetch_bytes(url: &str, opts: &FetchOptions) -> Option<Vec<u8>> {
    if let Some((status, bytes)) = reqwest_with_retries(url, opts) {
        if status.is_success() {
            return Some(bytes);
        }
    }
    None
}
