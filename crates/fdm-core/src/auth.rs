//! Bearer tokens and the token-refresh retry combinator.
//!
//! The appliance hands out short-lived access tokens. When a call is rejected
//! with 401 the token is refreshed once through a [`TokenRefresher`] and the
//! call is replayed once; any other failure surfaces immediately.

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, warn};
use url::Url;

/// Access/refresh token pair supplied by the caller.
#[derive(Debug)]
pub struct Credentials {
    /// Bearer token sent with every request
    pub access_token: SecretString,
    /// Token used to obtain a new access token
    pub refresh_token: SecretString,
}

impl Credentials {
    /// Create a credential pair.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
        }
    }
}

/// Holds the current credentials for one invocation.
///
/// A refresh replaces both tokens; every later request picks up the new
/// access token.
#[derive(Debug)]
pub struct TokenStore {
    current: RwLock<Credentials>,
}

impl TokenStore {
    /// Create a store seeded with the caller's credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            current: RwLock::new(credentials),
        }
    }

    /// Current access token.
    #[must_use]
    pub fn access_token(&self) -> String {
        self.read().access_token.expose_secret().to_string()
    }

    /// Copy of the current credential pair.
    #[must_use]
    pub fn snapshot(&self) -> Credentials {
        let current = self.read();
        Credentials::new(
            current.access_token.expose_secret(),
            current.refresh_token.expose_secret(),
        )
    }

    /// Replace the stored credentials.
    pub fn replace(&self, credentials: Credentials) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = credentials;
    }

    fn read(&self) -> RwLockReadGuard<'_, Credentials> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Obtains a fresh credential pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange the current refresh token for new credentials.
    async fn refresh(&self, current: &Credentials) -> Result<Credentials>;
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    access_token: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Refreshes tokens against the appliance's token endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    http: Client,
    token_url: Url,
}

impl HttpTokenRefresher {
    /// Create a refresher posting to `token_url`.
    #[must_use]
    pub const fn new(http: Client, token_url: Url) -> Self {
        Self { http, token_url }
    }

    /// Return the token endpoint.
    #[must_use]
    pub const fn token_url(&self) -> &Url {
        &self.token_url
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, current: &Credentials) -> Result<Credentials> {
        let payload = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: current.refresh_token.expose_secret(),
            access_token: current.access_token.expose_secret(),
        };

        debug!(url = %self.token_url, "requesting token refresh");
        let response = self
            .http
            .post(self.token_url.clone())
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let tokens: TokenResponse = serde_json::from_str(&text)?;
        Ok(Credentials::new(tokens.access_token, tokens.refresh_token))
    }
}

/// Run `call`, refreshing the token and replaying it once on a 401.
///
/// `call` must read the access token from `tokens` every time it is invoked so
/// the replay carries the refreshed token. A failed refresh, a second 401, or
/// any non-auth error is returned unchanged.
///
/// # Errors
///
/// Propagates the error of the call or of the refresh.
pub async fn retry_on_token_expiration<T, F, Fut>(
    tokens: &TokenStore,
    refresher: &dyn TokenRefresher,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match call().await {
        Err(err) if err.is_auth_failure() => {
            warn!(status = ?err.status(), "access token rejected, refreshing once");
            let current = tokens.snapshot();
            let refreshed = refresher.refresh(&current).await?;
            tokens.replace(refreshed);
            call().await
        }
        outcome => outcome,
    }
}
