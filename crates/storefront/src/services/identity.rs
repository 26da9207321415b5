//! Identity provider client.
//!
//! Sessions are owned by the hosted auth service (GoTrue). The storefront
//! reads them, revokes them, and starts the provider's own sign-in and
//! password-reset flows; it never mints a session itself.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use seamline_core::{Email, IdentityId, Session};

use crate::config::SupabaseConfig;

/// Errors talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an unexpected error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Provider response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider is not reachable or misconfigured.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Bearer credential issued by the provider.
///
/// Implements `Debug` manually so tokens never reach logs.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// User record as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of a successful password sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub access_token: AccessToken,
    /// Seconds until the access token expires.
    pub expires_in: u64,
}

/// Operations the storefront needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a token to a live session.
    ///
    /// `Ok(None)` means the token is malformed, expired or unknown to the
    /// provider.
    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, IdentityError>;

    /// The user a token belongs to, as the provider sees it right now.
    async fn get_user(&self, token: &AccessToken) -> Result<Option<Identity>, IdentityError>;

    /// Terminate the session behind `token`. Revoking an already dead
    /// session succeeds.
    async fn sign_out(&self, token: &AccessToken) -> Result<(), IdentityError>;

    /// Exchange email and password for a session. `Ok(None)` on bad credentials.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Option<SignedIn>, IdentityError>;

    /// Ask the provider to mail a password reset link.
    async fn send_password_reset(
        &self,
        email: &Email,
        redirect_to: Option<&Url>,
    ) -> Result<(), IdentityError>;
}

/// Claims the storefront reads from an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenClaims {
    /// Decode the payload segment of a JWT without verifying the signature.
    ///
    /// Verification is the provider's job (`get_user`); this only lets
    /// expired tokens skip the round-trip.
    #[must_use]
    pub fn peek(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return None;
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// GoTrue REST client.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
    auth_url: Url,
}

impl SupabaseAuth {
    /// Create a new auth client.
    ///
    /// # Errors
    ///
    /// Returns an error if the project URL or anon key is unusable.
    pub fn new(config: &SupabaseConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.anon_key)
                .map_err(|e| IdentityError::Unavailable(format!("invalid anon key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;

        let auth_url = config
            .url
            .join("auth/v1/")
            .map_err(|e| IdentityError::Unavailable(format!("invalid project URL: {e}")))?;

        Ok(Self { client, auth_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.auth_url
            .join(path)
            .map_err(|e| IdentityError::Unavailable(format!("invalid auth URL: {e}")))
    }

    async fn api_error(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        IdentityError::Api { status, message }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, IdentityError> {
        let Some(claims) = TokenClaims::peek(token.expose()) else {
            tracing::debug!("Access token is not a JWT");
            return Ok(None);
        };

        let Some(expires_at) = claims.expires_at().filter(|exp| *exp > Utc::now()) else {
            tracing::debug!("Access token expired");
            return Ok(None);
        };

        let Some(identity) = self.get_user(token).await? else {
            return Ok(None);
        };

        if claims
            .sub
            .as_deref()
            .is_some_and(|sub| sub != identity.id.to_string())
        {
            tracing::warn!(identity_id = %identity.id, "Token subject does not match provider user");
            return Ok(None);
        }

        Ok(Some(Session::new(identity.id, identity.email, expires_at)))
    }

    async fn get_user(&self, token: &AccessToken) -> Result<Option<Identity>, IdentityError> {
        let response = self
            .client
            .get(self.endpoint("user")?)
            .bearer_auth(token.expose())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let identity = response
                    .json::<Identity>()
                    .await
                    .map_err(|e| IdentityError::Parse(e.to_string()))?;
                Ok(Some(identity))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.endpoint("logout")?)
            .bearer_auth(token.expose())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Session already gone.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Option<SignedIn>, IdentityError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });

        let response = self.client.post(url).json(&body).send().await?;

        match response.status() {
            status if status.is_success() => {
                let token = response
                    .json::<TokenResponse>()
                    .await
                    .map_err(|e| IdentityError::Parse(e.to_string()))?;
                Ok(Some(SignedIn {
                    access_token: AccessToken::new(token.access_token),
                    expires_in: token.expires_in,
                }))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Ok(None),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn send_password_reset(
        &self,
        email: &Email,
        redirect_to: Option<&Url>,
    ) -> Result<(), IdentityError> {
        let mut url = self.endpoint("recover")?;
        if let Some(redirect_to) = redirect_to {
            url.query_pairs_mut()
                .append_pair("redirect_to", redirect_to.as_str());
        }

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "email": email.as_str() }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jwt(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    fn auth() -> SupabaseAuth {
        SupabaseAuth::new(&SupabaseConfig {
            // Nothing listens here; tests below must not reach the network.
            url: Url::parse("http://127.0.0.1:9/").unwrap(),
            anon_key: "anon".to_string(),
            service_role_key: SecretString::from("service"),
        })
        .unwrap()
    }

    #[test]
    fn test_peek_reads_claims() {
        let token = jwt(&serde_json::json!({
            "sub": "0b6f3c1e-5d2a-4b8e-9c41-2f7e8a9d0c13",
            "exp": 1_900_000_000,
            "email": "staff@seamline.shop",
            "role": "authenticated"
        }));
        let claims = TokenClaims::peek(&token).unwrap();
        assert_eq!(
            claims.sub.as_deref(),
            Some("0b6f3c1e-5d2a-4b8e-9c41-2f7e8a9d0c13")
        );
        assert_eq!(claims.email.as_deref(), Some("staff@seamline.shop"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_peek_rejects_malformed() {
        assert!(TokenClaims::peek("").is_none());
        assert!(TokenClaims::peek("not-a-jwt").is_none());
        assert!(TokenClaims::peek("a.b").is_none());
        assert!(TokenClaims::peek("a.b.c.d").is_none());
        assert!(TokenClaims::peek("a.!!!.c").is_none());
        // Valid base64 but no exp claim
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#));
        assert!(TokenClaims::peek(&token).is_none());
    }

    #[tokio::test]
    async fn test_get_session_short_circuits_without_round_trip() {
        let auth = auth();

        let malformed = AccessToken::new("garbage");
        assert!(auth.get_session(&malformed).await.unwrap().is_none());

        let expired = AccessToken::new(jwt(&serde_json::json!({
            "sub": "0b6f3c1e-5d2a-4b8e-9c41-2f7e8a9d0c13",
            "exp": 1_000_000_000
        })));
        assert!(auth.get_session(&expired).await.unwrap().is_none());
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJ.super-secret.sig");
        let debug = format!("{token:?}");
        assert_eq!(debug, "AccessToken([REDACTED])");
        assert_eq!(token.expose(), "eyJ.super-secret.sig");
    }

    #[test]
    fn test_endpoints_are_under_auth_v1() {
        let auth = auth();
        assert_eq!(auth.endpoint("user").unwrap().path(), "/auth/v1/user");
        assert_eq!(auth.endpoint("logout").unwrap().path(), "/auth/v1/logout");
    }
}
