//! Who may do what: the per-request session gate and the publish capability
//! shared by the page views and the JSON endpoint.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::models::user::Session;
use crate::routes::AppState;
use crate::services::{AuthService, Credential};

pub const SESSION_COOKIE: &str = "blog_session";

/// The signed-in owner for this request, if any.
///
/// Resolved from the session cookie on every request; a token the platform
/// no longer recognizes counts as a visitor.
#[derive(Clone, Debug, Default)]
pub struct CurrentUser(pub Option<Session>);

impl CurrentUser {
    pub fn is_owner(&self) -> bool {
        self.0.is_some()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()) else {
            return Ok(Self(None));
        };

        match state.platform.current_user(&token).await {
            Ok(Some(user)) => Ok(Self(Some(Session {
                user,
                access_token: token,
            }))),
            Ok(None) => Ok(Self(None)),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve session, treating as visitor");
                Ok(Self(None))
            }
        }
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Permission to write posts.
#[derive(Clone, Debug)]
pub enum Publisher {
    /// The owner, writing with their own session.
    Owner(Session),
    /// A caller that presented the shared post secret.
    SecretHolder,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Denied;

impl Publisher {
    pub fn from_session(user: &CurrentUser) -> Result<Self, Denied> {
        user.0.clone().map(Self::Owner).ok_or(Denied)
    }

    /// Grants only when a secret is configured and the caller's matches it.
    pub fn from_secret(provided: Option<&str>, configured: Option<&str>) -> Result<Self, Denied> {
        match (provided, configured) {
            (Some(p), Some(c)) if !c.is_empty() && p == c => Ok(Self::SecretHolder),
            _ => Err(Denied),
        }
    }

    pub fn credential(&self) -> Credential<'_> {
        match self {
            Self::Owner(session) => Credential::User(&session.access_token),
            Self::SecretHolder => Credential::Service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;

    #[test]
    fn secret_must_match_configured_value() {
        assert!(Publisher::from_secret(Some("s3cret"), Some("s3cret")).is_ok());
        assert_eq!(
            Publisher::from_secret(Some("guess"), Some("s3cret")).unwrap_err(),
            Denied
        );
        assert!(Publisher::from_secret(None, Some("s3cret")).is_err());
    }

    #[test]
    fn unconfigured_secret_never_grants() {
        assert!(Publisher::from_secret(None, None).is_err());
        assert!(Publisher::from_secret(Some(""), Some("")).is_err());
        assert!(Publisher::from_secret(Some("anything"), None).is_err());
    }

    #[test]
    fn owner_writes_with_own_token() {
        let visitor = CurrentUser(None);
        assert!(Publisher::from_session(&visitor).is_err());

        let owner = CurrentUser(Some(Session {
            user: User {
                id: "u1".into(),
                email: None,
            },
            access_token: "jwt".into(),
        }));
        let publisher = Publisher::from_session(&owner).unwrap();
        assert_eq!(publisher.credential(), Credential::User("jwt"));
        assert_eq!(Publisher::SecretHolder.credential(), Credential::Service);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("tok".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
