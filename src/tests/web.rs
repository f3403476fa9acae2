//! The message endpoint served on a random local port.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::api::{AdminApi, ApiError, QuickAddReply, RawReply, ReplyBody};
use crate::scrape::FetchOptions;
use crate::snapshot::{ExtractOptions, Extractor, ProductSnapshot, RetryPolicy};
use crate::web::{self, SharedState};

struct AcceptAll;

impl AdminApi for AcceptAll {
    fn check_auth(&self) -> bool {
        true
    }

    fn login(&self, _: &str, _: &str) -> Result<(), ApiError> {
        Ok(())
    }

    fn quick_add_url(&self, url: &str) -> Result<RawReply, ApiError> {
        Ok(RawReply {
            status: 200,
            body: ReplyBody::Json(json!({"success": true, "url": url})),
        })
    }

    fn quick_add_snapshot(&self, _: &ProductSnapshot) -> Result<QuickAddReply, ApiError> {
        Ok(QuickAddReply::default())
    }
}

async fn serve() -> String {
    let state = SharedState {
        extractor: Arc::new(Extractor::new(
            ExtractOptions::default(),
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::ZERO,
                step: Duration::ZERO,
            },
        )),
        api: Arc::new(AcceptAll),
        fetch: FetchOptions::default(),
        message_timeout: Duration::from_secs(5),
        materialize_images: false,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, web::router(state)).await.unwrap();
    });
    format!("http://{addr}/api/message")
}

#[tokio::test(flavor = "multi_thread")]
pub async fn test_extract_with_inline_html() {
    let endpoint = serve().await;

    let html = r#"<html><head><script type="application/ld+json">
        {"@type":"Product","name":"Classic Tee","brand":"Acme","offers":{"price":"25.00"},"image":"https://x.com/a.jpg"}
        </script></head><body></body></html>"#;

    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&json!({
            "type": "extractProductSnapshot",
            "tab": {"url": "https://acme.com/tee", "html": html},
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Classic Tee");
    assert_eq!(body["price"], "$25.00");
    assert_eq!(body["retailerDomain"], "acme.com");
    assert_eq!(body["imageUrls"][0], "https://x.com/a.jpg");
}

#[tokio::test(flavor = "multi_thread")]
pub async fn test_extract_without_tab_is_bad_request() {
    let endpoint = serve().await;

    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&json!({"type": "extractProductSnapshot"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("tab"));
}

#[tokio::test(flavor = "multi_thread")]
pub async fn test_quick_add_message() {
    let endpoint = serve().await;

    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&json!({"type": "quickAdd", "url": "https://knit.com/scarf"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"ok": true, "status": 200, "data": {"success": true, "url": "https://knit.com/scarf"}})
    );
}

#[tokio::test(flavor = "multi_thread")]
pub async fn test_unknown_message_type_is_rejected() {
    let endpoint = serve().await;

    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&json!({"type": "deleteEverything"}))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}

#[tokio::test(flavor = "multi_thread")]
pub async fn test_quick_add_command_uses_active_tab() {
    let endpoint = serve().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(&endpoint)
        .json(&json!({"type": "quickAddCommand", "tab": {"url": "https://knit.com/active"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["url"], "https://knit.com/active");

    let resp = client
        .post(&endpoint)
        .json(&json!({"type": "quickAddCommand"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
pub async fn test_blank_quick_add_falls_back_to_tab() {
    let endpoint = serve().await;

    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&json!({"type": "quickAdd", "url": " ", "tab": {"url": "https://knit.com/tab"}}))
        .send()
        .await
        .unwrap();

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["url"], "https://knit.com/tab");
}
