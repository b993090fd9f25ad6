//! Authenticator implementation
//!
//! Applies Billomat credentials to outgoing requests.

use crate::error::{Error, Result};
use reqwest::RequestBuilder;

/// Header carrying the account API key
pub const API_KEY_HEADER: &str = "X-BillomatApiKey";

/// Header carrying the registered app id
pub const APP_ID_HEADER: &str = "X-AppId";

/// Header carrying the registered app secret
pub const APP_SECRET_HEADER: &str = "X-AppSecret";

/// Billomat API credentials
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Account API key
    pub api_key: String,
    /// App id (only for registered apps)
    pub app_id: Option<String>,
    /// App secret (only for registered apps)
    pub app_secret: Option<String>,
}

impl Credentials {
    /// Create credentials from an API key alone
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            app_id: None,
            app_secret: None,
        }
    }

    /// Add app id and secret
    #[must_use]
    pub fn with_app(mut self, app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Check that the API key is present
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::missing_field("api_key"));
        }
        if self.app_id.is_some() != self.app_secret.is_some() {
            return Err(Error::invalid_value(
                "app_id",
                "app_id and app_secret must be given together",
            ));
        }
        Ok(())
    }

    /// Header name/value pairs for these credentials
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![(API_KEY_HEADER, self.api_key.as_str())];
        if let Some(app_id) = &self.app_id {
            headers.push((APP_ID_HEADER, app_id.as_str()));
        }
        if let Some(app_secret) = &self.app_secret {
            headers.push((APP_SECRET_HEADER, app_secret.as_str()));
        }
        headers
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("has_app_secret", &self.app_secret.is_some())
            .finish()
    }
}

/// Authenticator handles applying credentials to HTTP requests
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Credentials,
}

impl Authenticator {
    /// Create a new authenticator for the given credentials
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        self.credentials
            .headers()
            .into_iter()
            .fold(req, |req, (name, value)| req.header(name, value))
    }

    /// The credentials in use
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}
