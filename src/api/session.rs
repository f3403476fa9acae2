use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::storage::StorageManager;

const SESSION_FILE: &str = "session.yaml";

/// Cookies handed out by the admin API at login, replayed on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Take `name=value` from a `Set-Cookie` header, ignoring attributes.
    /// An empty value (a deletion) removes the cookie.
    pub fn absorb_set_cookie(&mut self, header: &str) {
        let pair = header.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() {
            return;
        }
        if value.is_empty() {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }

    /// Value for a `Cookie` request header, `None` when there is nothing to send.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn load(store: &dyn StorageManager) -> anyhow::Result<Self> {
        if !store.exists(SESSION_FILE) {
            return Ok(Self::default());
        }
        let raw = String::from_utf8(store.read(SESSION_FILE)?).context("session is not valid utf8")?;
        serde_yml::from_str(&raw).context("session file is malformed")
    }

    pub fn save(&self, store: &dyn StorageManager) -> anyhow::Result<()> {
        store
            .write(SESSION_FILE, serde_yml::to_string(self)?.as_bytes())
            .context("writing session")
    }

    pub fn delete(store: &dyn StorageManager) -> anyhow::Result<()> {
        store.delete(SESSION_FILE).context("removing session")
    }
}
