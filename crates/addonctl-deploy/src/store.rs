//! Chrome Web Store API client.
//!
//! Only the two calls a release needs: upload a new package for an existing
//! item, then publish it.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{DeployError, DeployResult};

/// Base URL for package uploads.
pub const STORE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/chromewebstore/v1.1";

/// Base URL for item operations.
pub const STORE_API_BASE: &str = "https://www.googleapis.com/chromewebstore/v1.1";

const API_VERSION_HEADER: &str = "x-goog-api-version";
const API_VERSION: &str = "2";

/// Chrome Web Store API client.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http_client: reqwest::Client,
    upload_base: String,
    api_base: String,
}

impl StoreClient {
    /// Creates a client against the public endpoints.
    pub fn new(timeout: Option<Duration>) -> DeployResult<Self> {
        Self::with_base_urls(STORE_UPLOAD_BASE, STORE_API_BASE, timeout)
    }

    /// Creates a client against custom endpoints.
    pub fn with_base_urls(
        upload_base: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Option<Duration>,
    ) -> DeployResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| DeployError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Uploads a zip package as the new draft of `app_id`.
    pub async fn upload(&self, access_token: &str, app_id: &str, package: Vec<u8>) -> DeployResult<()> {
        let url = format!("{}/items/{}", self.upload_base, urlencoding::encode(app_id));
        debug!("PUT {} ({} bytes)", url, package.len());

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(access_token)
            .header(API_VERSION_HEADER, API_VERSION)
            .body(package)
            .send()
            .await
            .map_err(|e| DeployError::store(None, format!("upload request failed: {}", e)))?;

        let body = read_checked(response).await?;
        if let Some(state) = body.get("uploadState").and_then(Value::as_str) {
            info!("upload state: {}", state);
        }
        Ok(())
    }

    /// Publishes the current draft of `app_id`.
    pub async fn publish(&self, access_token: &str, app_id: &str) -> DeployResult<()> {
        let url = format!("{}/items/{}/publish", self.api_base, urlencoding::encode(app_id));
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .header(API_VERSION_HEADER, API_VERSION)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(|e| DeployError::store(None, format!("publish request failed: {}", e)))?;

        let body = read_checked(response).await?;
        if let Some(status) = body.get("status") {
            info!("publish status: {}", status);
        }
        if let Some(detail) = body.get("statusDetail") {
            warn!("publish status detail: {}", detail);
        }
        Ok(())
    }
}

async fn read_checked(response: reqwest::Response) -> DeployResult<Value> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| DeployError::store(Some(status), format!("failed to read response: {}", e)))?;
    check_response(status, &body)
}

/// Interprets a store response.
///
/// A non-200 status fails with the API's `error.message`. A 200 response
/// still fails when its body carries a non-empty `itemError`.
pub fn check_response(status: u16, body: &str) -> DeployResult<Value> {
    if status != 200 {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body.trim()));
        return Err(DeployError::store(Some(status), message));
    }

    let json: Value = serde_json::from_str(body).map_err(|e| {
        DeployError::store(Some(status), format!("invalid response body: {}", e))
    })?;

    if let Some(item_error) = json.get("itemError").filter(|v| has_content(v)) {
        return Err(DeployError::store(Some(status), item_error.to_string()));
    }

    Ok(json)
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use addonctl_core::testing::{StubResponse, StubServer};

    use super::*;

    fn store_message(result: DeployResult<Value>) -> (Option<u16>, String) {
        match result {
            Err(DeployError::StoreApi { status, message }) => (status, message),
            other => panic!("expected StoreApi error, got {:?}", other),
        }
    }

    #[test]
    fn non_200_uses_error_message() {
        let (status, message) = store_message(check_response(
            400,
            r#"{"error": {"code": 400, "message": "X"}}"#,
        ));
        assert_eq!(status, Some(400));
        assert_eq!(message, "X");
    }

    #[test]
    fn non_200_without_json_keeps_body() {
        let (_, message) = store_message(check_response(502, "Bad Gateway"));
        assert_eq!(message, "HTTP 502: Bad Gateway");
    }

    #[test]
    fn item_error_on_200_is_a_failure() {
        let body = r#"{"kind": "chromewebstore#item", "uploadState": "FAILURE",
            "itemError": [{"error_code": "PKG_INVALID_VERSION_NUMBER", "error_detail": "bad version"}]}"#;
        let (status, message) = store_message(check_response(200, body));
        assert_eq!(status, Some(200));
        assert!(message.contains("PKG_INVALID_VERSION_NUMBER"));
    }

    #[test]
    fn empty_item_error_is_success() {
        let json = check_response(200, r#"{"uploadState": "SUCCESS", "itemError": []}"#).unwrap();
        assert_eq!(json["uploadState"], "SUCCESS");
        assert!(check_response(200, r#"{"status": ["OK"], "itemError": null}"#).is_ok());
    }

    #[test]
    fn non_json_200_is_a_failure() {
        assert!(check_response(200, "<html>").is_err());
    }

    #[tokio::test]
    async fn upload_sends_package_with_headers() {
        let server = StubServer::start(vec![StubResponse::json(
            200,
            r#"{"id": "app", "uploadState": "SUCCESS"}"#,
        )])
        .unwrap();
        let client = StoreClient::with_base_urls(server.url(), server.url(), None).unwrap();

        client.upload("tok", "app", b"PK\x03\x04".to_vec()).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].path, "/items/app");
        assert_eq!(requests[0].header("authorization"), Some("Bearer tok"));
        assert_eq!(requests[0].header("x-goog-api-version"), Some("2"));
        assert_eq!(requests[0].body, b"PK\x03\x04");
    }

    #[tokio::test]
    async fn upload_rejects_with_api_message() {
        let server = StubServer::start(vec![StubResponse::json(
            403,
            r#"{"error": {"code": 403, "message": "X"}}"#,
        )])
        .unwrap();
        let client = StoreClient::with_base_urls(server.url(), server.url(), None).unwrap();

        let err = client.upload("tok", "app", Vec::new()).await.unwrap_err();
        match err {
            DeployError::StoreApi { message, status } => {
                assert_eq!(message, "X");
                assert_eq!(status, Some(403));
            }
            other => panic!("expected StoreApi, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_rejects_item_error_on_200() {
        let server = StubServer::start(vec![StubResponse::json(
            200,
            r#"{"status": ["ITEM_PENDING_REVIEW"], "itemError": [{"error_code": "E"}]}"#,
        )])
        .unwrap();
        let client = StoreClient::with_base_urls(server.url(), server.url(), None).unwrap();

        let err = client.publish("tok", "app").await.unwrap_err();
        assert!(matches!(err, DeployError::StoreApi { status: Some(200), .. }));

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/items/app/publish");
        assert_eq!(requests[0].header("content-length"), Some("0"));
    }
}
