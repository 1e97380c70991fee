//! Bearer-token authentication for HTTP handlers.
//!
//! The extractor resolves `Authorization: Bearer <token>` through the
//! injected identity port. Tokens never reach the logs; rejected attempts
//! are logged with a short SHA-256 fingerprint instead.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::domain::{Error, UserId};
use crate::inbound::http::state::HttpState;

/// Length of the hex token fingerprint emitted to logs.
const FINGERPRINT_CHARS: usize = 16;

/// Short, non-reversible token reference safe to log.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut fingerprint = hex::encode(digest);
    fingerprint.truncate(FINGERPRINT_CHARS);
    fingerprint
}

/// Pull the bearer token out of the `Authorization` header.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_owned())
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(UserId);

impl Identity {
    /// Identifier of the authenticated user.
    pub fn user_id(&self) -> &UserId {
        &self.0
    }
}

/// Resolve a request into an identity, or the 401 to return instead.
async fn authenticate(req: HttpRequest) -> Result<Identity, Error> {
    let state = req
        .app_data::<web::Data<HttpState>>()
        .ok_or_else(|| Error::internal("http state not configured"))?;
    let token =
        bearer_token(&req).ok_or_else(|| Error::unauthorized("missing bearer token"))?;

    match state.identity.resolve(&token).await {
        Ok(Some(user_id)) => Ok(Identity(user_id)),
        Ok(None) => {
            debug!(
                token = %token_fingerprint(&token),
                "bearer token did not resolve to a user"
            );
            Err(Error::unauthorized("invalid bearer token"))
        }
        Err(error) => {
            warn!(%error, "identity resolution failed");
            Err(Error::service_unavailable("authentication unavailable"))
        }
    }
}

impl FromRequest for Identity {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    #[rstest]
    #[case("Bearer abc123", Some("abc123"))]
    #[case("bearer abc123", Some("abc123"))]
    #[case("Basic abc123", None)]
    #[case("Bearer ", None)]
    fn bearer_token_extraction(#[case] header: &str, #[case] expected: Option<&str>) {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, header))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), expected);
    }

    #[rstest]
    fn missing_header_yields_no_token() {
        let req = TestRequest::default().to_http_request();
        assert!(bearer_token(&req).is_none());
    }

    #[rstest]
    fn fingerprint_is_stable_and_short() {
        let a = token_fingerprint("some-token");
        let b = token_fingerprint("some-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_CHARS);
        assert_ne!(a, token_fingerprint("other-token"));
    }
}
