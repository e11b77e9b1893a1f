//! OAuth 2.0 exchanges against Google's token endpoint.
//!
//! Two flows are supported:
//!
//! - the out-of-band authorization code flow: the user opens the
//!   authorization URL, grants access, and pastes the code Google displays;
//! - the refresh token flow used by unattended jobs.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};
use crate::tokens::Token;

/// OAuth client for Google APIs.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: Credentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    ///
    /// No timeout is applied to token requests unless one is given.
    pub fn new(credentials: Credentials, timeout: Option<Duration>) -> AuthResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(|e| {
            AuthError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
        })?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Returns the client credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Builds the URL the user must visit to grant `scopes`.
    pub fn authorization_url(&self, scopes: &[String]) -> AuthResult<String> {
        let scope = scopes.join(" ");
        let url = Url::parse_with_params(
            &self.credentials.auth_uri,
            &[
                ("access_type", "offline"),
                ("scope", scope.as_str()),
                ("response_type", "code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| {
            AuthError::configuration(format!(
                "invalid auth_uri '{}': {}",
                self.credentials.auth_uri, e
            ))
        })?;

        Ok(url.into())
    }

    /// Exchanges an authorization code for a token set.
    pub async fn exchange_code(&self, code: &str, scopes: &[String]) -> AuthResult<Token> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code.trim()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];

        let (status, body) = self
            .post_form(&params)
            .await
            .map_err(|e| AuthError::auth_exchange(format!("token exchange request failed: {}", e)))?;

        if !status.is_success() {
            return Err(AuthError::auth_exchange(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::auth_exchange(format!("invalid token response: {}", e))
        })?;

        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::auth_exchange("no access_token in token response"))?;

        info!("obtained tokens from authorization code");
        Ok(Token::issued(
            access_token,
            response.refresh_token,
            response.token_type,
            response.scope.or_else(|| Some(scopes.join(" "))),
            response.expires_in,
        ))
    }

    /// Exchanges a refresh token for a fresh access token.
    ///
    /// The client id and secret are the ones this client was built with.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<String> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let (status, body) = self
            .post_form(&params)
            .await
            .map_err(|e| AuthError::token_refresh(format!("token refresh request failed: {}", e)))?;

        let token = access_token_from_refresh(status, &body)?;
        info!("refreshed access token");
        Ok(token)
    }

    async fn post_form(
        &self,
        params: &[(&str, &str)],
    ) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
        debug!("POST {}", self.credentials.token_uri);
        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

/// Extracts `access_token` from a refresh response body.
///
/// Any body without a non-empty `access_token` is a failure, whatever the
/// HTTP status said.
fn access_token_from_refresh(status: reqwest::StatusCode, body: &str) -> AuthResult<String> {
    let response: TokenResponse = serde_json::from_str(body).map_err(|e| {
        AuthError::token_refresh(format!(
            "invalid token response ({}): {}",
            status, e
        ))
    })?;

    if let Some(token) = response.access_token.filter(|t| !t.is_empty()) {
        return Ok(token);
    }

    let reason = match (response.error, response.error_description) {
        (Some(error), Some(description)) => format!(": {} ({})", error, description),
        (Some(error), None) => format!(": {}", error),
        _ => String::new(),
    };
    Err(AuthError::token_refresh(format!(
        "no access_token in response ({}){}",
        status, reason
    )))
}

/// Response from Google's token endpoint.
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthErrorCode;
    use addonctl_core::testing::{StubResponse, StubServer};
    use reqwest::StatusCode;

    fn client_for(token_uri: &str) -> OAuthClient {
        let creds = Credentials::new("client-id", "client-secret").with_token_uri(token_uri);
        OAuthClient::new(creds, None).unwrap()
    }

    #[test]
    fn authorization_url_format() {
        let client = client_for("https://example.invalid/token");
        let url = client
            .authorization_url(&[
                "https://www.googleapis.com/auth/script.projects".to_string(),
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
            ])
            .unwrap();

        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(url.starts_with(crate::credentials::DEFAULT_AUTH_URI));
        assert!(pairs.contains(&("access_type".into(), "offline".into())));
        assert!(pairs.contains(&("client_id".into(), "client-id".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            crate::credentials::OOB_REDIRECT_URI.into()
        )));
        assert!(pairs.contains(&(
            "scope".into(),
            "https://www.googleapis.com/auth/script.projects https://www.googleapis.com/auth/spreadsheets".into()
        )));
    }

    #[test]
    fn refresh_response_without_access_token() {
        let err = access_token_from_refresh(StatusCode::OK, "{}").unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::TokenRefresh);
    }

    #[test]
    fn refresh_response_reports_google_error() {
        let err = access_token_from_refresh(
            StatusCode::BAD_REQUEST,
            r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::TokenRefresh);
        assert!(err.message().contains("invalid_grant"));
    }

    #[test]
    fn refresh_response_not_json() {
        let err = access_token_from_refresh(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::TokenRefresh);
    }

    #[tokio::test]
    async fn refresh_sends_form_and_returns_token() {
        let server = StubServer::start(vec![StubResponse::json(
            200,
            r#"{"access_token": "fresh", "expires_in": 3599, "token_type": "Bearer"}"#,
        )])
        .unwrap();
        let client = client_for(&format!("{}/o/oauth2/token", server.url()));

        let token = client.refresh_access_token("long-lived").await.unwrap();
        assert_eq!(token, "fresh");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/o/oauth2/token");
        let body = requests[0].body_text();
        assert!(body.contains("grant_type=refresh_token"));
        assert!(body.contains("refresh_token=long-lived"));
        assert!(body.contains("client_id=client-id"));
    }

    #[tokio::test]
    async fn refresh_with_empty_body_fails() {
        let server = StubServer::start(vec![StubResponse::json(200, "{}")]).unwrap();
        let client = client_for(&format!("{}/token", server.url()));

        let err = client.refresh_access_token("long-lived").await.unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::TokenRefresh);
    }

    #[tokio::test]
    async fn unreachable_endpoint_keeps_the_exchange_code() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = client_for(&format!("http://127.0.0.1:{}/token", port));

        let err = client.refresh_access_token("long-lived").await.unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::TokenRefresh);
        assert!(err.message().contains("token refresh request failed"));

        let err = client.exchange_code("4/abc", &[]).await.unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::AuthExchange);
    }

    #[tokio::test]
    async fn exchange_code_builds_token() {
        let server = StubServer::start(vec![StubResponse::json(
            200,
            r#"{"access_token": "a", "refresh_token": "r", "expires_in": 3600, "token_type": "Bearer"}"#,
        )])
        .unwrap();
        let client = client_for(&format!("{}/token", server.url()));

        let token = client
            .exchange_code(" 4/abc \n", &["scope-a".to_string()])
            .await
            .unwrap();
        assert_eq!(token.access_token, "a");
        assert_eq!(token.refresh_token.as_deref(), Some("r"));
        assert_eq!(token.scope.as_deref(), Some("scope-a"));
        assert!(token.expiry_date.is_some());

        let body = server.requests()[0].body_text();
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=4%2Fabc"));
    }

    #[tokio::test]
    async fn exchange_code_rejected() {
        let server = StubServer::start(vec![StubResponse::json(
            400,
            r#"{"error": "invalid_grant"}"#,
        )])
        .unwrap();
        let client = client_for(&format!("{}/token", server.url()));

        let err = client.exchange_code("bad", &[]).await.unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::AuthExchange);
        assert!(err.message().contains("invalid_grant"));
    }
}
