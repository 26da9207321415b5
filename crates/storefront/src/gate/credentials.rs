//! Where a request carries its access token.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::services::AccessToken;

/// Cookie holding the provider's access token.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Where a request carried its credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `Authorization: Bearer`, sent by the client-side credential store.
    Bearer,
    /// The session cookie set at sign-in.
    Cookie,
}

/// Access token read from a request, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: AccessToken,
    pub source: CredentialSource,
}

impl Credential {
    /// The credential the gate evaluates: `Authorization: Bearer` first,
    /// then the cookie.
    ///
    /// Every enforcement point reads credentials through here, so they all
    /// judge the same token.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        bearer_token(headers)
            .map(|token| Self {
                token,
                source: CredentialSource::Bearer,
            })
            .or_else(|| cookie_token(headers))
    }

    /// Every credential the request carries, in gate precedence.
    #[must_use]
    pub fn all_from_headers(headers: &HeaderMap) -> Vec<Self> {
        bearer_token(headers)
            .map(|token| Self {
                token,
                source: CredentialSource::Bearer,
            })
            .into_iter()
            .chain(cookie_token(headers))
            .collect()
    }

    /// Whether the browser holds this credential as the session cookie.
    #[must_use]
    pub const fn is_cookie(&self) -> bool {
        matches!(self.source, CredentialSource::Cookie)
    }
}

fn cookie_token(headers: &HeaderMap) -> Option<Credential> {
    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(Cookie::value)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Credential {
            token: AccessToken::new(v),
            source: CredentialSource::Cookie,
        })
}

fn bearer_token(headers: &HeaderMap) -> Option<AccessToken> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| AccessToken::new(token))
}

/// Cookie set after a successful sign-in.
#[must_use]
pub fn session_cookie(token: &AccessToken, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
    Cookie::build((ACCESS_TOKEN_COOKIE, token.expose().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Cookie that makes the browser drop the credential.
#[must_use]
pub fn expired_cookie() -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .build()
}
