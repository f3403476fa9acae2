//! Fire-and-forget quick-add of a bare URL.

use serde_json::Value;

use crate::api::{AdminApi, ReplyBody};
use crate::bridge::QuickAddResponse;

pub const QUICK_ADD_FAILED: &str = "Failed to quick-add";

/// What asked for a quick-add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Context menu on a page or a link
    ContextMenu {
        link_url: Option<String>,
        page_url: Option<String>,
        tab_url: Option<String>,
    },
    /// Keyboard shortcut on the active tab
    Command { tab_url: Option<String> },
}

impl Trigger {
    /// The URL to save: a clicked link, else the page, else the tab.
    pub fn target_url(&self) -> Option<&str> {
        let candidates: Vec<Option<&String>> = match self {
            Trigger::ContextMenu {
                link_url,
                page_url,
                tab_url,
            } => vec![link_url.as_ref(), page_url.as_ref(), tab_url.as_ref()],
            Trigger::Command { tab_url } => vec![tab_url.as_ref()],
        };
        candidates
            .into_iter()
            .flatten()
            .map(|u| u.trim())
            .find(|u| !u.is_empty())
    }
}

/// Post `{url}` and fold every outcome into a [`QuickAddResponse`].
pub fn quick_add(api: &dyn AdminApi, url: &str) -> QuickAddResponse {
    let reply = match api.quick_add_url(url) {
        Ok(reply) => reply,
        Err(err) => {
            log::error!("quick add network error: {err}");
            return QuickAddResponse {
                ok: false,
                error: Some(err.to_string()),
                ..Default::default()
            };
        }
    };

    if reply.is_success() {
        log::info!("quick add of {url} accepted ({})", reply.status);
        let data = match reply.body {
            ReplyBody::Json(value) => value,
            ReplyBody::Text(text) => Value::String(text),
        };
        return QuickAddResponse {
            ok: true,
            status: Some(reply.status),
            data: Some(data),
            error: None,
        };
    }

    let error = match &reply.body {
        ReplyBody::Json(value) => value
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        ReplyBody::Text(text) if !text.is_empty() => Some(text.clone()),
        ReplyBody::Text(_) => None,
    }
    .unwrap_or_else(|| QUICK_ADD_FAILED.to_string());

    log::error!("quick add failed: {} {error}", reply.status);
    QuickAddResponse {
        ok: false,
        status: Some(reply.status),
        data: None,
        error: Some(error),
    }
}

/// Resolve the trigger's URL and quick-add it. Triggers without a URL are
/// ignored.
pub fn handle_trigger(api: &dyn AdminApi, trigger: &Trigger) -> Option<QuickAddResponse> {
    let Some(url) = trigger.target_url() else {
        log::debug!("quick add trigger without a url, ignoring");
        return None;
    };
    Some(quick_add(api, url))
}
