//! The save-to-wardrobe flow: auth, preview, confirm, submit.

use std::{thread, time::Duration};

use crate::api::{AdminApi, ApiError};
use crate::bridge::ContentScript;
use crate::snapshot::ProductSnapshot;

pub const SAVE_LABEL: &str = "Save to Wardrobe";
pub const SAVING_LABEL: &str = "Saving...";
pub const SAVED_LABEL: &str = "Saved";
pub const RETRY_LABEL: &str = "Try Again";

pub const MSG_NO_PRODUCT: &str = "No product details found.";
pub const MSG_REFRESH: &str = "Please refresh the page.";
pub const MSG_MISSING_CREDENTIALS: &str = "Enter email & password";
pub const MSG_SIGNING_IN: &str = "Signing in...";
pub const MSG_SESSION_FAILED: &str = "Session failed.";
pub const MSG_LOGIN_FAILED: &str = "Login failed.";
pub const MSG_NETWORK: &str = "Network error.";
pub const MSG_SAVED: &str = "Saved to Library! ✨";
pub const MSG_SESSION_EXPIRED: &str = "Session expired.";

/// Pause between a successful login and the auth re-check, giving the
/// server time to make the new session visible.
pub const LOGIN_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub tone: Tone,
}

impl Notice {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupState {
    pub view: View,
    pub snapshot: Option<ProductSnapshot>,
    pub notice: Option<Notice>,
    pub save_label: String,
    pub save_enabled: bool,
}

impl Default for PopupState {
    fn default() -> Self {
        Self {
            view: View::Login,
            snapshot: None,
            notice: None,
            save_label: SAVE_LABEL.to_string(),
            save_enabled: true,
        }
    }
}

impl PopupState {
    fn notify(&mut self, text: &str, tone: Tone) {
        self.notice = Some(Notice::new(text, tone));
    }

    /// Check auth and ask the page for a snapshot at the same time.
    ///
    /// `script` is `None` when there is no page to ask (no active tab).
    pub fn initialize(
        api: &dyn AdminApi,
        script: Option<&ContentScript>,
        timeout: Duration,
    ) -> PopupState {
        let mut state = PopupState::default();

        let (authenticated, extracted) = thread::scope(|s| {
            let auth = s.spawn(|| api.check_auth());
            let extracted = script.map(|script| script.request_snapshot(timeout));
            (auth.join().unwrap_or(false), extracted)
        });

        match extracted {
            None => {}
            Some(Ok(snapshot)) if !snapshot.url.is_empty() => state.snapshot = Some(snapshot),
            Some(Ok(_)) => state.notify(MSG_NO_PRODUCT, Tone::Error),
            Some(Err(err)) => {
                log::info!("extraction unavailable: {err}");
                state.notify(MSG_REFRESH, Tone::Info);
            }
        }

        state.view = if authenticated { View::Save } else { View::Login };
        state
    }

    pub fn login(&mut self, api: &dyn AdminApi, email: &str, password: &str) {
        self.login_with_settle(api, email, password, LOGIN_SETTLE)
    }

    pub fn login_with_settle(
        &mut self,
        api: &dyn AdminApi,
        email: &str,
        password: &str,
        settle: Duration,
    ) {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            self.notify(MSG_MISSING_CREDENTIALS, Tone::Error);
            return;
        }

        self.notify(MSG_SIGNING_IN, Tone::Info);

        match api.login(email, password) {
            Ok(()) => {
                thread::sleep(settle);
                if api.check_auth() {
                    self.view = View::Save;
                    self.notice = None;
                } else {
                    self.notify(MSG_SESSION_FAILED, Tone::Error);
                }
            }
            Err(ApiError::Network(err)) => {
                log::warn!("login network error: {err}");
                self.notify(MSG_NETWORK, Tone::Error);
            }
            Err(err) => {
                log::info!("{err}");
                self.notify(MSG_LOGIN_FAILED, Tone::Error);
            }
        }
    }

    /// Send the previewed snapshot. Does nothing without one.
    pub fn submit(&mut self, api: &dyn AdminApi) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };

        self.save_enabled = false;
        self.save_label = SAVING_LABEL.to_string();

        match api.quick_add_snapshot(snapshot) {
            Ok(reply) => {
                log::info!(
                    "saved {:?}",
                    reply.item.and_then(|i| i.name).unwrap_or_else(|| snapshot.name.clone())
                );
                self.notify(MSG_SAVED, Tone::Success);
                self.save_label = SAVED_LABEL.to_string();
            }
            Err(ApiError::SessionExpired) => {
                self.view = View::Login;
                self.notify(MSG_SESSION_EXPIRED, Tone::Error);
                self.save_label = SAVE_LABEL.to_string();
                self.save_enabled = true;
            }
            Err(err) => {
                let message = match err {
                    ApiError::Rejected(message) => message,
                    ApiError::Network(_) => MSG_NETWORK.to_string(),
                    other => other.to_string(),
                };
                self.notify(&message, Tone::Error);
                self.save_label = RETRY_LABEL.to_string();
                self.save_enabled = true;
            }
        }
    }

    /// Plain-text preview of the current state.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        match self.view {
            View::Login => lines.push("Sign in to save items.".to_string()),
            View::Save => {
                if let Some(s) = &self.snapshot {
                    let brand = s.brand.as_deref().unwrap_or(&s.retailer_domain);
                    lines.push(brand.to_uppercase());
                    lines.push(s.name.clone());
                    if let Some(price) = &s.price {
                        lines.push(price.clone());
                    }
                    if let Some(image) = s.image_url.as_ref().or(s.image_urls.first()) {
                        let mut line = format!("image: {image}");
                        if s.gallery_count() > 0 {
                            line.push_str(&format!(" +{}", s.gallery_count()));
                        }
                        lines.push(line);
                    }
                }
                lines.push(format!("[ {} ]", self.save_label));
            }
        }

        if let Some(notice) = &self.notice {
            let prefix = match notice.tone {
                Tone::Error => "error: ",
                Tone::Info | Tone::Success => "",
            };
            lines.push(format!("{prefix}{}", notice.text));
        }

        lines.join("\n")
    }
}
