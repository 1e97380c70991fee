//! Port for the interest catalogue backing the vector slots.

use async_trait::async_trait;

/// Errors raised by interest catalogue adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterestCatalogError {
    /// Catalogue backend is unavailable.
    #[error("interest catalogue unavailable: {message}")]
    Unavailable {
        /// Underlying failure description.
        message: String,
    },
}

impl InterestCatalogError {
    /// Create an unavailable error with the given message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Display names for interest-vector slots, index `i` naming slot `i`
/// (catalogue rows ordered by ascending id).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InterestCatalog: Send + Sync {
    /// All interest names in slot order.
    async fn names(&self) -> Result<Vec<String>, InterestCatalogError>;
}

/// Static catalogue used by tests and database-less deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureInterestCatalog;

/// Slot names served by [`FixtureInterestCatalog`].
const FIXTURE_INTERESTS: [&str; 15] = [
    "Hiking",
    "Cooking",
    "Photography",
    "Board games",
    "Running",
    "Cinema",
    "Live music",
    "Reading",
    "Travel",
    "Cycling",
    "Painting",
    "Yoga",
    "Gardening",
    "Chess",
    "Volunteering",
];

#[async_trait]
impl InterestCatalog for FixtureInterestCatalog {
    async fn names(&self) -> Result<Vec<String>, InterestCatalogError> {
        Ok(FIXTURE_INTERESTS.iter().map(|name| (*name).to_owned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::INTEREST_SLOTS;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn fixture_covers_every_slot() {
        let names = FixtureInterestCatalog.names().await.expect("fixture names");
        assert_eq!(names.len(), INTEREST_SLOTS);
    }
}
