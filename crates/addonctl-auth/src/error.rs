//! Error types for the OAuth layer.

use std::fmt;
use thiserror::Error;

/// The category of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
    /// Exchanging an authorization code for tokens failed.
    AuthExchange,
    /// Exchanging a refresh token for an access token failed.
    TokenRefresh,
    /// Missing or malformed client secret / token files.
    Configuration,
    /// Reading or writing a credential file failed.
    Io,
    /// Unexpected internal state.
    Internal,
}

impl AuthErrorCode {
    /// Returns a stable snake_case name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthExchange => "auth_exchange",
            Self::TokenRefresh => "token_refresh",
            Self::Configuration => "configuration_error",
            Self::Io => "io_error",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while obtaining or storing OAuth credentials.
#[derive(Debug, Error)]
pub struct AuthError {
    code: AuthErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    /// Creates a new error with the given code and message.
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an authorization-code exchange error.
    pub fn auth_exchange(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::AuthExchange, message)
    }

    /// Creates a refresh-token exchange error.
    pub fn token_refresh(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::TokenRefresh, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Configuration, message)
    }

    /// Creates an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Io, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Internal, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> AuthErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for OAuth operations.
pub type AuthResult<T> = Result<T, AuthError>;
