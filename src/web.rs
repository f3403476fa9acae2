use crate::{
    api::AdminApi,
    background::{self, Trigger},
    bridge::{BridgeError, ContentScript, Message},
    scrape::FetchOptions,
    snapshot::{Extractor, HttpImageFetcher, HttpPageSource, PageSource, RawPage, StaticPageSource},
};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::signal;

#[derive(Clone)]
pub struct SharedState {
    pub extractor: Arc<Extractor>,
    pub api: Arc<dyn AdminApi>,
    pub fetch: FetchOptions,
    pub message_timeout: Duration,
    /// Inline images into extraction replies
    pub materialize_images: bool,
}

impl SharedState {
    fn content_script(&self, tab: Tab) -> ContentScript {
        let source: Arc<dyn PageSource> = match tab.html {
            Some(html) => Arc::new(StaticPageSource::new(RawPage::new(tab.url, html))),
            None => Arc::new(HttpPageSource::new(tab.url, self.fetch.clone())),
        };
        let script = ContentScript::new(self.extractor.clone(), source);
        if self.materialize_images {
            script.with_images(Arc::new(HttpImageFetcher::new(self.fetch.clone())))
        } else {
            script
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => log::warn!("interrupted, shutting down"),
        _ = terminate => log::warn!("terminated, shutting down"),
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/message", post(message))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(Arc::new(state))
}

async fn start_app(listen: &str, state: SharedState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Serve the message endpoint until interrupted.
pub fn start_daemon(listen: &str, state: SharedState) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(listen, state))
}

#[derive(thiserror::Error, Debug)]
pub enum DaemonError {
    #[error("extractProductSnapshot needs a tab")]
    MissingTab,

    #[error("nothing to quick-add: no url and no active tab")]
    MissingUrl,

    #[error("{0}")]
    Bridge(#[from] BridgeError),

    #[error("worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug)]
struct HttpError(DaemonError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            DaemonError::MissingTab | DaemonError::MissingUrl => {
                axum::http::StatusCode::BAD_REQUEST
            }
            DaemonError::Bridge(BridgeError::Timeout(_)) => axum::http::StatusCode::GATEWAY_TIMEOUT,
            DaemonError::Bridge(BridgeError::Disconnected) => axum::http::StatusCode::BAD_GATEWAY,
            DaemonError::Worker(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<DaemonError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// The page a message is about.
#[derive(Debug, Clone, Deserialize)]
pub struct Tab {
    pub url: String,
    /// Page HTML as the browser has it; fetched over HTTP when absent
    #[serde(default)]
    pub html: Option<String>,
}

#[derive(Deserialize)]
pub struct MessageRequest {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default)]
    pub tab: Option<Tab>,
}

impl Debug for MessageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tab = self.tab.as_ref().map(|t| (&t.url, t.html.as_ref().map(String::len)));
        write!(f, "MessageRequest {{ message: {:?}, tab(url, html_len): {:?} }}", self.message, tab)
    }
}

async fn message(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<MessageRequest>,
) -> Result<axum::response::Response, HttpError> {
    log::debug!("payload: {payload:?}");

    match payload.message {
        Message::ExtractProductSnapshot => {
            let tab = payload.tab.ok_or(DaemonError::MissingTab)?;
            let script = state.content_script(tab);
            let timeout = state.message_timeout;

            let snapshot =
                tokio::task::spawn_blocking(move || script.request_snapshot(timeout)).await??;
            Ok(Json(snapshot).into_response())
        }
        Message::QuickAdd { url } => {
            let trigger = Trigger::ContextMenu {
                link_url: None,
                page_url: Some(url),
                tab_url: payload.tab.map(|t| t.url),
            };
            quick_add(state, trigger).await
        }
        Message::QuickAddCommand => {
            let trigger = Trigger::Command {
                tab_url: payload.tab.map(|t| t.url),
            };
            quick_add(state, trigger).await
        }
    }
}

async fn quick_add(
    state: Arc<SharedState>,
    trigger: Trigger,
) -> Result<axum::response::Response, HttpError> {
    let api = state.api.clone();
    let response =
        tokio::task::spawn_blocking(move || background::handle_trigger(api.as_ref(), &trigger))
            .await?
            .ok_or(DaemonError::MissingUrl)?;
    Ok(Json(response).into_response())
}
