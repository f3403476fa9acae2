use std::{
    sync::{PoisonError, RwLock},
    time::Duration,
};

use reqwest::{
    blocking::RequestBuilder,
    header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    StatusCode,
};
use serde_json::{json, Value};

use super::{
    errors::ApiError, session::Session, AdminApi, QuickAddReply, RawReply, ReplyBody, SERVER_ERROR,
};
use crate::{config::ApiConfig, config::Endpoint, snapshot::ProductSnapshot, storage::StorageManager};

/// Blocking client for the admin API, carrying the login session.
pub struct AdminClient {
    base_url: String,
    endpoint: Endpoint,
    client: reqwest::blocking::Client,
    session: RwLock<Session>,
    store: Option<Box<dyn StorageManager>>,
}

impl AdminClient {
    pub fn new(config: &ApiConfig, session: Session) -> Result<AdminClient, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(AdminClient {
            base_url,
            endpoint: config.endpoint,
            client,
            session: RwLock::new(session),
            store: None,
        })
    }

    /// Persist the session to `store` whenever login changes it.
    pub fn with_store(mut self, store: Box<dyn StorageManager>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn session(&self) -> Session {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forget the session locally and on disk.
    pub fn logout(&self) -> anyhow::Result<()> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Session::default();
        if let Some(store) = &self.store {
            Session::delete(store.as_ref())?;
        }
        Ok(())
    }

    fn with_cookies(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session().cookie_header() {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        log::info!("GET {}{}", self.base_url, path);
        self.with_cookies(self.client.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        log::info!("POST {}{}", self.base_url, path);
        self.with_cookies(self.client.post(format!("{}{}", self.base_url, path)))
    }
}

impl AdminApi for AdminClient {
    fn check_auth(&self) -> bool {
        match self.get("/api/auth/me").send() {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                log::debug!("auth check failed: {err}");
                false
            }
        }
    }

    fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let resp = self
            .post("/api/auth/login")
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let reason = resp
                .json::<Value>()
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
            log::warn!("login rejected with {status}");
            return Err(ApiError::LoginFailed(reason));
        }

        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        for header in resp.headers().get_all(SET_COOKIE) {
            if let Ok(value) = header.to_str() {
                session.absorb_set_cookie(value);
            }
        }

        if let Some(store) = &self.store {
            if let Err(err) = session.save(store.as_ref()) {
                log::warn!("session not persisted: {err:#}");
            }
        }

        Ok(())
    }

    fn quick_add_url(&self, url: &str) -> Result<RawReply, ApiError> {
        let resp = self
            .post(self.endpoint.quick_add_path())
            .json(&json!({ "url": url }))
            .send()?;

        let status = resp.status().as_u16();
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        let text = resp.text().unwrap_or_default();

        let body = if is_json {
            ReplyBody::Json(serde_json::from_str(&text).unwrap_or(Value::Null))
        } else {
            ReplyBody::Text(text)
        };

        Ok(RawReply { status, body })
    }

    fn quick_add_snapshot(&self, snapshot: &ProductSnapshot) -> Result<QuickAddReply, ApiError> {
        let resp = self
            .post(self.endpoint.quick_add_path())
            .json(&json!({ "snapshot": snapshot }))
            .send()?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::SessionExpired);
        }

        let text = resp.text()?;
        let reply = match serde_json::from_str::<QuickAddReply>(&text) {
            Ok(reply) => reply,
            Err(err) => {
                log::error!("{err}. tried to parse: {text:?}");
                return Err(ApiError::Rejected(SERVER_ERROR.to_string()));
            }
        };

        if status.is_success() && reply.success {
            return Ok(reply);
        }

        let message = reply
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| SERVER_ERROR.to_string());
        Err(ApiError::Rejected(message))
    }
}
