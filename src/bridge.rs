//! Request/reply contract between the popup, the background worker and the
//! content side that owns the page.

use std::{
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::{self, Extractor, ImageFetcher, PageSource, ProductSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    ExtractProductSnapshot,
    QuickAdd { url: String },
    /// Keyboard shortcut: quick-add whatever the active tab shows
    QuickAddCommand,
}

/// Reply to [`Message::QuickAdd`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickAddResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("no reply from the page within {0:?}")]
    Timeout(Duration),

    #[error("the page went away before replying")]
    Disconnected,
}

/// The content side bound to one page.
#[derive(Clone)]
pub struct ContentScript {
    extractor: Arc<Extractor>,
    source: Arc<dyn PageSource>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
}

impl ContentScript {
    pub fn new(extractor: Arc<Extractor>, source: Arc<dyn PageSource>) -> Self {
        Self {
            extractor,
            source,
            fetcher: None,
        }
    }

    /// Inline images into the reply.
    pub fn with_images(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn url(&self) -> &str {
        self.source.url()
    }

    /// Answer `extractProductSnapshot` on the calling thread.
    pub fn handle_extract(&self) -> ProductSnapshot {
        snapshot::extract_snapshot(&self.extractor, self.source.as_ref(), self.fetcher.as_deref())
            .snapshot
    }

    /// Ask for a snapshot and wait at most `timeout` for it.
    ///
    /// The work runs on its own thread; on timeout that thread is left to
    /// finish and its reply is dropped.
    pub fn request_snapshot(&self, timeout: Duration) -> Result<ProductSnapshot, BridgeError> {
        let (tx, rx) = mpsc::channel();
        let script = self.clone();

        let spawned = thread::Builder::new()
            .name("content-script".to_string())
            .spawn(move || {
                let snapshot = script.handle_extract();
                if tx.send(snapshot).is_err() {
                    log::debug!("{}: reply arrived after the caller gave up", script.url());
                }
            });
        if let Err(err) = spawned {
            log::error!("could not start content worker: {err}");
            return Err(BridgeError::Disconnected);
        }

        match rx.recv_timeout(timeout) {
            Ok(snapshot) => Ok(snapshot),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::warn!("{}: no snapshot within {timeout:?}", self.url());
                Err(BridgeError::Timeout(timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(BridgeError::Disconnected),
        }
    }
}
