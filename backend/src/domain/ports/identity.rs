//! Port for resolving a bearer token to a stable user identity.
//!
//! Token issuance and verification belong to the external identity
//! provider; the core only needs "token in, user id or nothing out".

use async_trait::async_trait;

use crate::domain::user::UserId;

/// Errors raised by identity adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The identity backend is unavailable.
    #[error("identity backend unavailable: {message}")]
    Unavailable {
        /// Underlying failure description.
        message: String,
    },
}

impl IdentityError {
    /// Create an unavailable error with the given message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Resolve a request token into a user identity, or `None` when the token
/// does not authenticate anyone.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a bearer token.
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, IdentityError>;
}

/// Resolver that accepts any syntactically valid user UUID as a token.
///
/// Deployment stand-in for the external authenticator; also what the
/// integration tests authenticate with.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityResolver;

#[async_trait]
impl IdentityResolver for FixtureIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, IdentityError> {
        Ok(UserId::parse(token).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn fixture_accepts_uuid_tokens() {
        let id = UserId::random();
        let resolved = FixtureIdentityResolver
            .resolve(&id.to_string())
            .await
            .expect("resolver is infallible");
        assert_eq!(resolved, Some(id));
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_rejects_garbage_tokens() {
        let resolved = FixtureIdentityResolver
            .resolve("not-a-token")
            .await
            .expect("resolver is infallible");
        assert!(resolved.is_none());
    }
}
